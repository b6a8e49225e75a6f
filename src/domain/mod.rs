pub mod role;
pub mod user;
pub mod category;
pub mod class;
pub mod enrollment;
pub mod review;
pub mod payment;
pub mod contact;

pub use role::*;
pub use user::*;
pub use category::*;
pub use class::*;
pub use enrollment::*;
pub use review::*;
pub use payment::*;
pub use contact::*;
