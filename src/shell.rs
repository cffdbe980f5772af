//! Interactive text menu over a [`Kernel`].
//!
//! The shell is generic over its input and output streams so it can run
//! against a terminal or against in-memory buffers in tests.

use std::io::{self, BufRead, Write};

use crate::core::Kernel;
use crate::plugin::PluginLoader;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Show loaded plugins
    List,
    /// Run a plugin
    Execute,
    /// Reload plugins from disk
    Reload,
    /// Leave the shell
    Exit,
}

impl MenuChoice {
    /// Parse a menu selection. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::List),
            "2" => Some(Self::Execute),
            "3" => Some(Self::Reload),
            "4" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Interactive menu bound to a kernel and a pair of streams.
pub struct Shell<'k, L, R, W> {
    kernel: &'k mut Kernel<L>,
    input: R,
    output: W,
}

impl<'k, L, R, W> Shell<'k, L, R, W>
where
    L: PluginLoader,
    R: BufRead,
    W: Write,
{
    /// Create a shell.
    pub fn new(kernel: &'k mut Kernel<L>, input: R, output: W) -> Self {
        Self { kernel, input, output }
    }

    /// Run the menu loop until the user exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.print_menu()?;

            let Some(line) = self.prompt("\n> Select an option: ")? else {
                writeln!(self.output)?;
                return Ok(());
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::List) => self.print_plugins()?,
                Some(MenuChoice::Execute) => {
                    if !self.execute()? {
                        writeln!(self.output)?;
                        return Ok(());
                    }
                }
                Some(MenuChoice::Reload) => {
                    writeln!(self.output, "\nReloading plugins...\n")?;
                    self.kernel.reload();
                    self.print_load_report()?;
                }
                Some(MenuChoice::Exit) => {
                    writeln!(self.output, "\nGoodbye!")?;
                    return Ok(());
                }
                None => {
                    writeln!(self.output, "\n❌ Invalid option. Please choose 1, 2, 3 or 4.")?;
                }
            }
        }
    }

    /// Print the outcome of the most recent load pass.
    pub fn print_load_report(&mut self) -> io::Result<()> {
        for (_, plugin) in self.kernel.list() {
            writeln!(self.output, "✅ Plugin loaded: {}", plugin.name())?;
        }
        for failure in self.kernel.failures() {
            writeln!(self.output, "{}", failure.render())?;
        }

        let loaded = self.kernel.registry().len();
        let discovered = loaded + self.kernel.failures().len();
        if discovered == 0 {
            writeln!(self.output, "⚠️  No plugins found to load.")?;
        } else {
            writeln!(self.output, "\nTotal plugins loaded: {loaded}/{discovered}")?;
        }
        Ok(())
    }

    /// Print the numbered plugin listing.
    pub fn print_plugins(&mut self) -> io::Result<()> {
        let summaries = self.kernel.summaries();
        if summaries.is_empty() {
            return writeln!(self.output, "No plugins loaded.");
        }

        writeln!(self.output, "\n{RULE}\nAVAILABLE PLUGINS\n{RULE}")?;
        for summary in &summaries {
            writeln!(self.output, "\n[{}] {}", summary.index, summary.name)?;
            writeln!(self.output, "    {}", summary.description)?;
            writeln!(self.output, "    Module: {}", summary.key)?;
        }
        writeln!(self.output, "\n{RULE}")
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n{RULE}\nPLUGIN SYSTEM - MAIN MENU\n{RULE}")?;
        writeln!(self.output, "1. List available plugins")?;
        writeln!(self.output, "2. Execute a plugin")?;
        writeln!(self.output, "3. Reload plugins")?;
        writeln!(self.output, "4. Exit")?;
        writeln!(self.output, "{RULE}")
    }

    /// Returns `false` when input ended mid-prompt.
    fn execute(&mut self) -> io::Result<bool> {
        if self.kernel.registry().is_empty() {
            writeln!(self.output, "\n⚠️  No plugins loaded. Reload plugins first.")?;
            return Ok(true);
        }

        self.print_plugins()?;

        let Some(number) = self.prompt("Plugin number: ")? else {
            return Ok(false);
        };
        let Ok(index) = number.trim().parse::<usize>() else {
            writeln!(self.output, "❌ Please enter a valid number")?;
            return Ok(true);
        };
        let Some(data) = self.prompt("Input: ")? else {
            return Ok(false);
        };

        let result = self.kernel.dispatch(index, data.trim());
        writeln!(self.output, "\n{THIN_RULE}\nRESULT:\n{THIN_RULE}")?;
        writeln!(self.output, "{result}")?;
        writeln!(self.output, "{THIN_RULE}")?;
        Ok(true)
    }

    /// Write `message` and read one line. `None` means end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
