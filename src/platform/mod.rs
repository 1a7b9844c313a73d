// Board support for the collaborator traits

#[cfg(feature = "esp-idf")]
pub mod esp;
