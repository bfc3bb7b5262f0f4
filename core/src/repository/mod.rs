pub mod file;
pub mod memory;
pub mod supabase;
pub mod traits;

// Re-export
pub use file::FileStore;
pub use memory::MemoryStore;
pub use supabase::SupabaseStore;
pub use traits::{ProfileRepository, TaskRepository, WeeklyStatRepository};
