pub mod files;
pub mod lock;
pub mod paths;
pub mod record;
