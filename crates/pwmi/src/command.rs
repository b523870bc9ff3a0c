//!Commands accepted after the config file on the command line.

#[derive(Debug, PartialEq)]
pub enum Command {
    ///`set <ch>=<value>...` where `<ch>` is a channel number or output name
    Set(Vec<(String, i32)>),
    ///`get <ch>...`
    Get(Vec<String>),
    Reset,
    ///read `<output> <value>` lines from stdin until EOF or ctrl-c
    Run,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Command, String> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| "expected a command: set, get, reset or run".to_string())?;
        match name.as_str() {
            "set" if !rest.is_empty() => rest
                .iter()
                .map(|arg| parse_assignment(arg))
                .collect::<Result<Vec<_>, _>>()
                .map(Command::Set),
            "get" if !rest.is_empty() => Ok(Command::Get(rest.to_vec())),
            "set" | "get" => Err(format!("{} needs at least one channel", name)),
            "reset" => Ok(Command::Reset),
            "run" => Ok(Command::Run),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

fn parse_assignment(arg: &str) -> Result<(String, i32), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected <channel>=<value>, got '{}'", arg))?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("bad value in '{}': {}", arg, err))?;
    Ok((key.trim().to_string(), value))
}

///Split a `run` input line, `<output> <value>`.
pub fn parse_output_line(line: &str) -> Result<(&str, i32), String> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(value), None) => value
            .parse::<i32>()
            .map(|value| (name, value))
            .map_err(|err| format!("bad value '{}': {}", value, err)),
        _ => Err(format!("expected '<output> <value>', got '{}'", line.trim())),
    }
}
