pub mod clipedit;
pub mod faces;
pub mod gps;
pub mod imgedit;
pub mod renamer;
pub mod tiles;
