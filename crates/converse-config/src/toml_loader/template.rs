//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Converse Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[options]
# model = "gpt-3.5-turbo"
# style = "chat"                  # "chat" or "completion"
# endpoint = "https://api.openai.com/v1/chat/completions"
# temperature = 0.7               # 0.0-2.0
# max_tokens = 512                # reply ceiling
# top_p = 0.9                     # 0.0-1.0
# frequency_penalty = 0.0         # -2.0-2.0
# presence_penalty = 0.0          # -2.0-2.0
# stop = "<|im_end|>"
# ai_name = "ChatGPT"
# moderation = false
# price = 0.002                   # per 1000 tokens
# max_conversation_tokens = 4097  # prompt + reply ceiling

[transport]
# connect_timeout_secs = 10       # 1-600
# request_timeout_secs = 120      # 1-600

[logging]
# level = "INFO"                  # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
