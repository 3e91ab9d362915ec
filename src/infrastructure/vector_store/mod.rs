mod in_memory;
mod supabase;

pub use in_memory::InMemoryVectorStore;
pub use supabase::SupabaseVectorStore;
