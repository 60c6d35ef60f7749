pub mod extract;
pub mod inventory;
pub mod status;
pub mod toc;
