pub mod cat;
pub mod init;
pub mod mkdir;
pub mod put;
pub mod rm;
pub mod session;
pub mod share;
pub mod shared;
pub mod user;
pub mod validate;

pub use cat::Cat;
pub use init::Init;
pub use mkdir::Mkdir;
pub use put::Put;
pub use rm::Rm;
pub use share::Share;
pub use shared::Shared;
pub use user::User;
pub use validate::Validate;
