use bytes::BytesMut;
use redstore_common::CommandError;

use crate::{Parse, encode_line};

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get(String),
    Set {
        key: String,
        value: String,
    },
    /// TTL relativo, em segundos. Nunca vai para o AOF nessa forma.
    Expire {
        key: String,
        value: String,
        seconds: u64,
    },
    /// Expiração absoluta em milissegundos desde a época Unix.
    /// É a forma em que EXPIRE é gravado no AOF.
    ExpireAt {
        key: String,
        value: String,
        at_ms: u64,
    },
    Del(String),
    RPush {
        key: String,
        value: String,
    },
    LPop(String),
    HMSet {
        key: String,
        pairs: Vec<(String, String)>,
    },
    HMGet {
        key: String,
        fields: Vec<String>,
    },
    Exit,
    Unknown(String),
}

impl Command {
    /// Faz o parse de uma linha de texto em um Command.
    pub fn from_line(line: &str) -> Result<Command, CommandError> {
        let mut parse = Parse::new(line)?;
        let cmd_name = parse.command_name().to_string();

        let cmd = match cmd_name.as_str() {
            "GET" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::Get(key)
            }
            "SET" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                parse.finish()?;
                Command::Set { key, value }
            }
            "EXPIRE" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                let seconds = parse.next_u64()?;
                parse.finish()?;
                Command::Expire {
                    key,
                    value,
                    seconds,
                }
            }
            "EXPIREAT" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                let at_ms = parse.next_u64()?;
                parse.finish()?;
                Command::ExpireAt { key, value, at_ms }
            }
            "DEL" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::Del(key)
            }
            "RPUSH" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                parse.finish()?;
                Command::RPush { key, value }
            }
            "LPOP" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::LPop(key)
            }
            "HMSET" => {
                let key = parse.next_string()?;
                // Pelo menos um par e nenhum campo sem valor
                if !parse.has_remaining() || parse.remaining() % 2 != 0 {
                    return Err(CommandError::WrongArity("HMSET".into()));
                }
                let mut pairs = Vec::with_capacity(parse.remaining() / 2);
                while parse.has_remaining() {
                    let field = parse.next_string()?;
                    let value = parse.next_string()?;
                    pairs.push((field, value));
                }
                Command::HMSet { key, pairs }
            }
            "HMGET" => {
                let key = parse.next_string()?;
                if !parse.has_remaining() {
                    return Err(CommandError::WrongArity("HMGET".into()));
                }
                let mut fields = Vec::with_capacity(parse.remaining());
                while parse.has_remaining() {
                    fields.push(parse.next_string()?);
                }
                Command::HMGet { key, fields }
            }
            "EXIT" => {
                parse.finish()?;
                Command::Exit
            }
            _ => Command::Unknown(cmd_name),
        };

        Ok(cmd)
    }

    /// Nome do comando como aparece no protocolo e no AOF.
    pub fn name(&self) -> &str {
        match self {
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::Expire { .. } => "EXPIRE",
            Command::ExpireAt { .. } => "EXPIREAT",
            Command::Del(_) => "DEL",
            Command::RPush { .. } => "RPUSH",
            Command::LPop(_) => "LPOP",
            Command::HMSet { .. } => "HMSET",
            Command::HMGet { .. } => "HMGET",
            Command::Exit => "EXIT",
            Command::Unknown(name) => name.as_str(),
        }
    }

    /// Argumentos posicionais, na ordem do protocolo.
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::Get(key) | Command::Del(key) | Command::LPop(key) => vec![key.clone()],
            Command::Set { key, value } | Command::RPush { key, value } => {
                vec![key.clone(), value.clone()]
            }
            Command::Expire {
                key,
                value,
                seconds,
            } => vec![key.clone(), value.clone(), seconds.to_string()],
            Command::ExpireAt { key, value, at_ms } => {
                vec![key.clone(), value.clone(), at_ms.to_string()]
            }
            Command::HMSet { key, pairs } => {
                let mut args = Vec::with_capacity(1 + pairs.len() * 2);
                args.push(key.clone());
                for (field, value) in pairs {
                    args.push(field.clone());
                    args.push(value.clone());
                }
                args
            }
            Command::HMGet { key, fields } => {
                let mut args = vec![key.clone()];
                args.extend(fields.iter().cloned());
                args
            }
            Command::Exit | Command::Unknown(_) => vec![],
        }
    }

    /// Linha de texto `NOME arg1 arg2 ...`, sem terminador.
    /// Argumentos não são escapados: um argumento com espaço corrompe a linha.
    pub fn to_line(&self) -> String {
        let mut line = self.name().to_string();
        for arg in self.args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    /// Encoda o comando como linha terminada em `\n`.
    pub fn encode(&self, dst: &mut BytesMut) {
        encode_line(&self.to_line(), dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get() {
        let cmd = Command::from_line("GET mykey").unwrap();
        assert_eq!(cmd, Command::Get("mykey".into()));
    }

    #[test]
    fn parse_set_simple() {
        let cmd = Command::from_line("SET key value").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: "key".into(),
                value: "value".into(),
            }
        );
    }

    #[test]
    fn parse_set_only_one_arg() {
        assert!(matches!(
            Command::from_line("SET onlyonearg"),
            Err(CommandError::WrongArity(_))
        ));
    }

    #[test]
    fn parse_set_extra_args() {
        assert!(matches!(
            Command::from_line("SET k v extra"),
            Err(CommandError::WrongArity(_))
        ));
    }

    #[test]
    fn parse_expire() {
        let cmd = Command::from_line("EXPIRE session abc 30").unwrap();
        assert_eq!(
            cmd,
            Command::Expire {
                key: "session".into(),
                value: "abc".into(),
                seconds: 30,
            }
        );
    }

    #[test]
    fn parse_expire_invalid_seconds() {
        assert!(matches!(
            Command::from_line("EXPIRE k v soon"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(Command::from_line("EXPIRE k v").is_err());
    }

    #[test]
    fn parse_expireat() {
        let cmd = Command::from_line("EXPIREAT k v 1700000000000").unwrap();
        assert_eq!(
            cmd,
            Command::ExpireAt {
                key: "k".into(),
                value: "v".into(),
                at_ms: 1_700_000_000_000,
            }
        );
    }

    #[test]
    fn parse_del() {
        assert_eq!(
            Command::from_line("DEL k").unwrap(),
            Command::Del("k".into())
        );
    }

    #[test]
    fn parse_rpush_lpop() {
        assert_eq!(
            Command::from_line("RPUSH list a").unwrap(),
            Command::RPush {
                key: "list".into(),
                value: "a".into(),
            }
        );
        assert_eq!(
            Command::from_line("LPOP list").unwrap(),
            Command::LPop("list".into())
        );
    }

    #[test]
    fn parse_hmset_pairs() {
        let cmd = Command::from_line("HMSET h f1 v1 f2 v2").unwrap();
        assert_eq!(
            cmd,
            Command::HMSet {
                key: "h".into(),
                pairs: vec![
                    ("f1".into(), "v1".into()),
                    ("f2".into(), "v2".into()),
                ],
            }
        );
    }

    #[test]
    fn parse_hmset_odd_pairs() {
        assert!(Command::from_line("HMSET h f1 v1 f2").is_err());
        assert!(Command::from_line("HMSET h").is_err());
    }

    #[test]
    fn parse_hmget() {
        let cmd = Command::from_line("HMGET h f1 f3").unwrap();
        assert_eq!(
            cmd,
            Command::HMGet {
                key: "h".into(),
                fields: vec!["f1".into(), "f3".into()],
            }
        );
        assert!(Command::from_line("HMGET h").is_err());
    }

    #[test]
    fn parse_exit() {
        assert_eq!(Command::from_line("exit").unwrap(), Command::Exit);
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            Command::from_line("FOOBAR x").unwrap(),
            Command::Unknown("FOOBAR".into())
        );
    }

    #[test]
    fn case_insensitive_commands() {
        assert_eq!(
            Command::from_line("get Key").unwrap(),
            Command::Get("Key".into())
        );
    }

    #[test]
    fn blank_line_is_empty_command() {
        assert!(matches!(Command::from_line(""), Err(CommandError::Empty)));
    }

    #[test]
    fn to_line_matches_log_format() {
        let cmd = Command::HMSet {
            key: "h".into(),
            pairs: vec![("f".into(), "v".into())],
        };
        assert_eq!(cmd.to_line(), "HMSET h f v");

        let mut buf = BytesMut::new();
        Command::Del("k".into()).encode(&mut buf);
        assert_eq!(&buf[..], b"DEL k\n");
    }

    #[test]
    fn to_line_parses_back() {
        let cmd = Command::ExpireAt {
            key: "k".into(),
            value: "v".into(),
            at_ms: 42,
        };
        assert_eq!(Command::from_line(&cmd.to_line()).unwrap(), cmd);
    }
}
