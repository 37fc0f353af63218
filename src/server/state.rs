use crate::pipeline::Pipeline;
use crate::providers::{SpeechProvider, TranslationProvider};

pub(crate) struct ServerState<T: TranslationProvider, S: SpeechProvider> {
    pub(crate) pipeline: Pipeline<T, S>,
    pub(crate) landing_page: String,
}
