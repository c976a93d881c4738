pub mod check;
pub mod i18n;
pub mod interview;
pub mod outline;
pub mod schema;
pub mod status;
