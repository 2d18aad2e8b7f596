pub mod currency;
pub mod expense;
pub mod member;
pub mod pot;
pub mod settlement;
pub mod split;
pub mod validation;
