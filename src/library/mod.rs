// Library module
// Loads the bird cards the playlist plays from

pub mod cards;

pub use cards::load_cards;
