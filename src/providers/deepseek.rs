//! DeepSeek adapter (OpenAI-compatible envelope)

use reqwest::Client;

use super::ChatCompletionsAdapter;

const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";

pub fn deepseek_adapter(client: Client) -> ChatCompletionsAdapter {
    ChatCompletionsAdapter::new(client, "deepseek", DEEPSEEK_API_BASE, "deepseek-chat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderAdapter;

    #[test]
    fn deepseek_defaults() {
        let adapter = deepseek_adapter(Client::new());
        assert_eq!(adapter.name(), "deepseek");
        assert_eq!(adapter.default_model(), "deepseek-chat");
    }
}
