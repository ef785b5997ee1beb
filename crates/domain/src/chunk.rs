/// One text fragment produced by `TextChunker`, with its estimated token
/// count (`spec.md` §3 `ChunkPlan`, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub estimated_tokens: usize,
}

/// An ordered sequence of chunks whose concatenation (up to whitespace
/// normalization) equals the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub chunks: Vec<TextChunk>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
