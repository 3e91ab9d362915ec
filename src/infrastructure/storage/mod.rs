mod in_memory;
mod supabase;

pub use in_memory::InMemoryBlobStore;
pub use supabase::SupabaseStorage;
