mod build;
mod dev;
mod platforms;
mod version;

pub use build::cmd_build;
pub use dev::cmd_dev;
pub use platforms::cmd_platforms;
pub use version::cmd_version;
