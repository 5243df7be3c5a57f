pub mod memo;
pub mod memory;

pub use memo::{MemoRepository, MemoRow, PostgresMemoRepository};
pub use memory::InMemoryMemoRepository;
