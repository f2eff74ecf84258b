pub mod harvest;
pub mod inspect;

pub use harvest::handle_harvest;
pub use inspect::handle_inspect;
