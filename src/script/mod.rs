//! # Ejecución de scripts
//! src/script/mod.rs
//!
//! Ejecuta `.py` y `.php` con un intérprete externo y captura su salida
//! estándar (acotada) como cuerpo de la respuesta.
//!
//! ```text
//! python /www/scripts/hola.py nombre=ana   →  "Hola ana!\n"
//! ```
//!
//! ## Modos de invocación
//!
//! - `Argv` (por defecto): el intérprete se lanza directamente; los argumentos
//!   del cliente se separan por espacios y se pasan como argv. No interviene
//!   ningún shell.
//! - `Shell`: `sh -c "<intérprete> <script> <args>"`, igual que `popen`.
//!   **Permite inyección de comandos**: los argumentos vienen del cliente sin
//!   escapar. Solo para compatibilidad con scripts que dependen del shell.
//!
//! La llamada es síncrona: el worker espera a que el proceso termine y no hay
//! timeout, un script colgado bloquea su worker.

use clap::ValueEnum;
use serde::Deserialize;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Bytes máximos de salida que se capturan de un script
pub const SCRIPT_OUTPUT_LIMIT: usize = 8191;

/// Intérpretes soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Python,
    Php,
}

/// Cómo se construye la invocación del intérprete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Proceso directo, argumentos como argv
    #[default]
    Argv,

    /// Línea de comandos interpretada por `sh -c`
    Shell,
}

/// Errores al ejecutar un script; todos terminan en 500
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read script output: {0}")]
    Read(#[source] io::Error),

    #[error("failed to wait for the script: {0}")]
    Wait(#[source] io::Error),

    #[error("script produced no output")]
    EmptyOutput,
}

/// Lanza los intérpretes configurados
#[derive(Debug, Clone)]
pub struct ScriptGateway {
    python: String,
    php: String,
    mode: InvocationMode,
}

impl ScriptGateway {
    pub fn new(python: &str, php: &str, mode: InvocationMode) -> Self {
        Self {
            python: python.to_string(),
            php: php.to_string(),
            mode,
        }
    }

    /// Programa que ejecuta un intérprete dado
    pub fn program(&self, interpreter: Interpreter) -> &str {
        match interpreter {
            Interpreter::Python => &self.python,
            Interpreter::Php => &self.php,
        }
    }

    /// Arma el comando para ejecutar `script` con `args`
    pub fn command(&self, interpreter: Interpreter, script: &Path, args: &str) -> Command {
        let program = self.program(interpreter);

        match self.mode {
            InvocationMode::Argv => {
                let mut command = Command::new(program);
                command.arg(script).args(args.split_ascii_whitespace());
                command
            }
            InvocationMode::Shell => {
                let mut command = Command::new("sh");
                command
                    .arg("-c")
                    .arg(format!("{} {} {}", program, script.display(), args));
                command
            }
        }
    }

    /// Ejecuta el script y retorna su salida estándar
    ///
    /// Se leen como mucho `SCRIPT_OUTPUT_LIMIT` bytes; después se cierra el pipe y
    /// se espera al proceso. El exit status no se revisa, solo que haya salida.
    ///
    /// # Errores
    ///
    /// * `Spawn` - no se pudo lanzar el intérprete
    /// * `Read` / `Wait` - fallo leyendo el pipe o esperando al proceso
    /// * `EmptyOutput` - el script no escribió nada
    pub fn run(&self, interpreter: Interpreter, script: &Path, args: &str) -> Result<Vec<u8>, ScriptError> {
        let mut child = self
            .command(interpreter, script, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ScriptError::Spawn {
                program: self.program(interpreter).to_string(),
                source,
            })?;

        let mut output = Vec::new();
        let read = match child.stdout.take() {
            Some(stdout) => stdout.take(SCRIPT_OUTPUT_LIMIT as u64).read_to_end(&mut output),
            None => Ok(0),
        };
        let waited = child.wait();

        read.map_err(ScriptError::Read)?;
        waited.map_err(ScriptError::Wait)?;

        if output.is_empty() {
            return Err(ScriptError::EmptyOutput);
        }
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Usa `sh` como "intérprete" para no depender de python/php
    fn sh_gateway(mode: InvocationMode) -> ScriptGateway {
        ScriptGateway::new("sh", "sh", mode)
    }

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_argv_mode_passes_args() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "calc.py", "echo \"args: $*\"\n");

        let output = sh_gateway(InvocationMode::Argv)
            .run(Interpreter::Python, &script, "foo x=1")
            .unwrap();

        assert_eq!(output, b"args: foo x=1\n");
    }

    #[test]
    fn test_shell_mode_passes_args() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "index.php", "echo \"args: $*\"\n");

        let output = sh_gateway(InvocationMode::Shell)
            .run(Interpreter::Php, &script, "foo x=1")
            .unwrap();

        assert_eq!(output, b"args: foo x=1\n");
    }

    #[test]
    fn test_argv_mode_does_not_interpret_shell() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "calc.py", "echo \"args: $*\"\n");

        let output = sh_gateway(InvocationMode::Argv)
            .run(Interpreter::Python, &script, "x=1;echo injected")
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert_eq!(text, "args: x=1;echo injected\n");
    }

    #[test]
    fn test_shell_mode_is_injectable() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "calc.py", "echo \"args: $*\"\n");

        let output = sh_gateway(InvocationMode::Shell)
            .run(Interpreter::Python, &script, "x=1;echo injected")
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.lines().any(|line| line == "injected"));
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "quiet.py", "exit 0\n");

        let err = sh_gateway(InvocationMode::Argv)
            .run(Interpreter::Python, &script, "")
            .unwrap_err();

        assert!(matches!(err, ScriptError::EmptyOutput));
    }

    #[test]
    fn test_spawn_failure() {
        let gateway = ScriptGateway::new("/nonexistent/python", "php", InvocationMode::Argv);
        let err = gateway
            .run(Interpreter::Python, Path::new("/tmp/a.py"), "")
            .unwrap_err();

        assert!(matches!(err, ScriptError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/python"));
    }

    #[test]
    fn test_output_is_bounded() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "loud.py", "printf '%9000s' x\n");

        let output = sh_gateway(InvocationMode::Argv)
            .run(Interpreter::Python, &script, "")
            .unwrap();

        assert_eq!(output.len(), SCRIPT_OUTPUT_LIMIT);
    }

    #[test]
    fn test_program_selection() {
        let gateway = ScriptGateway::new("python3", "php8", InvocationMode::default());
        assert_eq!(gateway.program(Interpreter::Python), "python3");
        assert_eq!(gateway.program(Interpreter::Php), "php8");
    }
}
