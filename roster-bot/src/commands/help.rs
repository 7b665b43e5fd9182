//! Help command

pub fn execute(prefix: &str) -> String {
    format!(
        "**Register** by posting your friend code and in-game name in this channel:\n\
        `SW-1234-5678-9012 IGN: YourName`\n\n\
        **Commands:**\n\
        - `{p}mine` - Show the entries you have registered\n\
        - `{p}whitelist` - List every registered friend code\n\
        - `{p}help` - Show this message",
        p = prefix
    )
}
