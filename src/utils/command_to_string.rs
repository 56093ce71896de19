///////////////////////////////
/// Render a command the way it would be typed in a shell, for logs and failure reports
pub fn command_to_string(cmd: &std::process::Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|arg| {
        let arg = arg.to_string_lossy();
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            format!("'{}'", arg)
        } else {
            arg.to_string()
        }
    }));
    parts.join(" ")
}
