mod memory;
mod r#trait;

#[cfg(test)]
mod tests;

pub use memory::InMemoryRevocationRepository;
pub use r#trait::RevocationRepository;
