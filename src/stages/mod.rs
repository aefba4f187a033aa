pub mod stage0_normalize;
pub mod stage1_location;
pub mod stage2_search;
pub mod stage3_llm_enrich;
pub mod stage4_llm_score;

pub use stage0_normalize::*;
pub use stage1_location::*;
pub use stage2_search::*;
pub use stage3_llm_enrich::*;
pub use stage4_llm_score::*;
