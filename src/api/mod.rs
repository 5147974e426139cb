pub mod charges;
