pub mod cart;
pub mod ids;
pub mod listing;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use cart::*;
pub use ids::*;
pub use listing::*;
pub use money::*;
pub use order::*;
pub use product::*;
pub use user::*;
