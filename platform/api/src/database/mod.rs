mod exchange;
mod media;
mod notification;
mod payment;
mod plan;
mod rating;
mod request;
mod session;
mod strike;
mod user;

pub use common::database::Ulid;
pub use exchange::*;
pub use media::*;
pub use notification::*;
pub use payment::*;
pub use plan::*;
pub use rating::*;
pub use request::*;
pub use session::*;
pub use strike::*;
pub use user::*;
