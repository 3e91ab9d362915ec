mod cohere;

pub use cohere::CohereEmbedding;
