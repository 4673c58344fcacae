mod memory;
mod r#trait;


pub use memory::InMemoryRefreshTokenRepository;
pub use r#trait::RefreshTokenRepository;
