mod in_memory;
mod supabase;

pub use in_memory::InMemoryEvaluationStore;
pub use supabase::SupabaseEvaluationStore;
