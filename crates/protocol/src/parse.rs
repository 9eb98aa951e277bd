use redstore_common::CommandError;

/// Cursor sobre os tokens de uma linha para extrair argumentos sequencialmente.
pub struct Parse {
    name: String,
    parts: Vec<String>,
    pos: usize,
}

impl Parse {
    /// Tokeniza a linha por whitespace. O primeiro token vira o nome do
    /// comando, em maiúsculas.
    pub fn new(line: &str) -> Result<Parse, CommandError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(CommandError::Empty)?.to_uppercase();
        Ok(Parse {
            name,
            parts: tokens.map(str::to_string).collect(),
            pos: 0,
        })
    }

    pub fn command_name(&self) -> &str {
        &self.name
    }

    /// Retorna o próximo argumento.
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        if self.pos >= self.parts.len() {
            return Err(CommandError::WrongArity(self.name.clone()));
        }
        let part = std::mem::take(&mut self.parts[self.pos]);
        self.pos += 1;
        Ok(part)
    }

    /// Retorna o próximo argumento como inteiro não negativo.
    pub fn next_u64(&mut self) -> Result<u64, CommandError> {
        let s = self.next_string()?;
        s.parse::<u64>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um inteiro não negativo")))
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.has_remaining() {
            Err(CommandError::WrongArity(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    /// Retorna o número de argumentos restantes.
    pub fn remaining(&self) -> usize {
        self.parts.len() - self.pos
    }
}
