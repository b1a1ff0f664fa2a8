pub(crate) mod bmes_provider;
