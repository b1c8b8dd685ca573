//! Interactive questions asked during setup.

use super::interfaces::NetInterface;
use super::subnet::VpnSubnet;
use crate::error::{AdminError, Result};
use std::io::{BufRead, Write};

pub const DEFAULT_PORT: u16 = 51820;

pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a line of status output
    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Ask one question and return the trimmed answer. Closed input aborts.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "\n>>> {question}")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Err(AdminError::Aborted("input closed".into()));
        }
        Ok(answer.trim().to_string())
    }

    /// Anything but `y`/`yes` is a no
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} [y/N]: "))?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    pub fn choose_interface(&mut self, interfaces: &[NetInterface]) -> Result<String> {
        if interfaces.is_empty() {
            return self.ask("No interfaces detected. Enter interface manually: ");
        }

        self.say("Available interfaces:")?;
        for (index, iface) in interfaces.iter().enumerate() {
            self.say(&format!("  {}) {} ({})", index + 1, iface.name, iface.address))?;
        }

        loop {
            let answer = self.ask(&format!("Select interface [1-{}]: ", interfaces.len()))?;
            match answer.parse::<usize>() {
                Ok(choice) if (1..=interfaces.len()).contains(&choice) => {
                    return Ok(interfaces[choice - 1].name.clone());
                }
                _ => self.say("Invalid choice, try again.")?,
            }
        }
    }

    pub fn choose_port(&mut self) -> Result<u16> {
        loop {
            let answer = self.ask(&format!(
                "Enter a UDP port for your WG network (Press [Enter] to use default: {DEFAULT_PORT}): "
            ))?;
            if answer.is_empty() {
                return Ok(DEFAULT_PORT);
            }
            match answer.parse::<u16>() {
                Ok(port) if port >= 1 => return Ok(port),
                _ => self.say("Invalid port. Enter a number between 1 and 65535.")?,
            }
        }
    }

    pub fn choose_subnet(&mut self) -> Result<VpnSubnet> {
        loop {
            let answer = self.ask("Enter your desired VPN subnet (CIDR), e.g. 10.0.10.0/24: ")?;
            match answer.parse::<VpnSubnet>() {
                Ok(subnet) => return Ok(subnet),
                Err(e) => self.say(&e.to_string())?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn interfaces() -> Vec<NetInterface> {
        vec![
            NetInterface {
                name: "enp3s0".into(),
                address: "192.168.1.10/24".into(),
            },
            NetInterface {
                name: "wlp2s0".into(),
                address: "192.168.1.11/24".into(),
            },
        ]
    }

    #[test]
    fn test_confirm() {
        assert!(prompter("y\n").confirm("Continue?").unwrap());
        assert!(prompter(" YES \n").confirm("Continue?").unwrap());
        assert!(!prompter("\n").confirm("Continue?").unwrap());
        assert!(!prompter("n\n").confirm("Continue?").unwrap());
    }

    #[test]
    fn test_closed_input_aborts() {
        assert!(matches!(prompter("").ask("Anything?"), Err(AdminError::Aborted(_))));
        assert!(prompter("abc\n").choose_port().is_err());
    }

    #[test]
    fn test_choose_interface_retries_until_valid() {
        let mut p = prompter("0\nthree\n2\n");
        assert_eq!(p.choose_interface(&interfaces()).unwrap(), "wlp2s0");

        let output = String::from_utf8(p.output).unwrap();
        assert!(output.contains("  1) enp3s0 (192.168.1.10/24)"));
        assert_eq!(output.matches("Invalid choice, try again.").count(), 2);
    }

    #[test]
    fn test_choose_interface_manual_entry() {
        assert_eq!(prompter("eth9\n").choose_interface(&[]).unwrap(), "eth9");
    }

    #[test]
    fn test_choose_port() {
        assert_eq!(prompter("\n").choose_port().unwrap(), DEFAULT_PORT);
        assert_eq!(prompter("0\n70000\n51821\n").choose_port().unwrap(), 51821);
    }

    #[test]
    fn test_choose_subnet_retries() {
        let mut p = prompter("10.0.0.1/32\nnonsense\n10.6.0.0/24\n");
        let subnet = p.choose_subnet().unwrap();
        assert_eq!(subnet.to_string(), "10.6.0.0/24");

        let output = String::from_utf8(p.output).unwrap();
        assert!(output.contains("Subnet too small, need at least 2 addresses."));
        assert!(output.contains("Invalid subnet"));
    }
}
