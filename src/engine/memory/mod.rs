// Recall Engine — Memory Capabilities
//
// Concrete implementations of the capability traits in atoms/traits.rs.
//
// Module layout:
//   embedding.rs  — EmbeddingClient (Ollama + OpenAI-compatible API calls)
//   collection.rs — InMemoryCollection (brute-force cosine vector collection)
//   remote.rs     — RemoteMemoryClient (HTTP memory-search service)

pub mod collection;
pub mod embedding;
pub mod remote;

pub use collection::{cosine_similarity, InMemoryCollection};
pub use embedding::EmbeddingClient;
pub use remote::{parse_search_response, RemoteMemoryClient};
