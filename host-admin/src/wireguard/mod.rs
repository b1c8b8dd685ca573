//! WireGuard server provisioning for Fedora hosts (dnf + firewalld).
//!
//! Sets up `wg0` with one client peer, NATs it out of a chosen interface and
//! leaves the client config and its QR code in the working directory.

pub mod command;
pub mod interfaces;
pub mod prompt;
pub mod render;
pub mod subnet;

use crate::error::{AdminError, Result};
use command::CommandRunner;
use interfaces::parse_ip_addr_output;
use prompt::Prompter;
use render::{render_client_conf, render_server_conf, TunnelSettings, INTERFACE_NAME};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, Write};
use std::net::IpAddr;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const PACKAGES: &[&str] = &["wireguard-tools", "qrencode", "firewalld", "curl", "iproute"];
const SYSCTL_CONF: &str = "/etc/sysctl.d/99-wireguard.conf";
const EXTERNAL_IP_URL: &str = "https://ifconfig.me/ip";
const SERVICE: &str = "wg-quick@wg0";

/// (name, ingress zone, egress zone)
const DOCKER_POLICIES: &[(&str, &str, &str)] = &[
    ("wg-to-docker", "wg", "docker"),
    ("docker-to-wg", "docker", "wg"),
];

/// Files kept in the WireGuard directory
#[derive(Debug, Clone)]
pub struct WgPaths {
    pub dir: PathBuf,
    pub server_private: PathBuf,
    pub server_public: PathBuf,
    pub client_private: PathBuf,
    pub client_public: PathBuf,
    pub server_conf: PathBuf,
    pub client_conf: PathBuf,
    pub client_png: PathBuf,
}

impl WgPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            server_private: dir.join("server_private.key"),
            server_public: dir.join("server_public.key"),
            client_private: dir.join("client1_private.key"),
            client_public: dir.join("client1_public.key"),
            server_conf: dir.join(format!("{INTERFACE_NAME}.conf")),
            client_conf: dir.join("client1.conf"),
            client_png: dir.join("client1.png"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub install_packages: bool,
}

/// Write `content` readable by the owner only
pub fn write_private(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    // `mode` only applies on creation
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn read_key(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Keypair via `wg genkey` / `wg pubkey`, unless the private key already exists
pub fn ensure_keypair(runner: &CommandRunner, private: &Path, public: &Path) -> Result<()> {
    if private.exists() {
        if !public.exists() {
            let key = read_key(private)?;
            let public_key = runner.capture_with_input("wg", &["pubkey"], Some(&key))?;
            fs::write(public, format!("{public_key}\n"))?;
        }
        return Ok(());
    }

    let private_key = runner.capture("wg", &["genkey"])?;
    write_private(private, &format!("{private_key}\n"))?;
    let public_key = runner.capture_with_input("wg", &["pubkey"], Some(&private_key))?;
    fs::write(public, format!("{public_key}\n"))?;
    Ok(())
}

pub async fn detect_external_ip() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .ok()?;
    let response = client.get(EXTERNAL_IP_URL).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;
    let ip = body.trim();
    ip.parse::<IpAddr>().ok().map(|_| ip.to_string())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

fn stop_running_service<R: BufRead, W: Write>(
    runner: &CommandRunner,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let active = matches!(
        runner.capture("systemctl", &["is-active", SERVICE]).as_deref(),
        Ok("active")
    );
    if !active {
        return Ok(());
    }

    prompter.say(&format!("[!] {SERVICE} is already running!"))?;
    if prompter.confirm("Do you want to stop it before continuing?")? {
        prompter.say("[*] Stopping WireGuard service...")?;
        runner.run("systemctl", &["stop", SERVICE])
    } else {
        Err(AdminError::Aborted("Aborting to avoid conflicts.".into()))
    }
}

fn enable_forwarding(runner: &CommandRunner) -> Result<()> {
    fs::write(SYSCTL_CONF, "net.ipv4.ip_forward = 1\n")?;
    runner.run("sysctl", &["--system"])
}

fn setup_firewalld(runner: &CommandRunner, public_interface: &str, port: u16) -> Result<()> {
    runner.run("systemctl", &["enable", "--now", "firewalld"])?;
    runner.run("firewall-cmd", &["--permanent", &format!("--add-port={port}/udp")])?;
    runner.run("firewall-cmd", &["--permanent", "--add-masquerade"])?;
    runner.run(
        "firewall-cmd",
        &["--permanent", "--zone=public", &format!("--change-interface={public_interface}")],
    )?;
    // Both fail harmlessly when the zone is already set up
    runner.run_allow_failure("firewall-cmd", &["--permanent", "--new-zone=wg"]);
    runner.run_allow_failure(
        "firewall-cmd",
        &["--permanent", "--zone=wg", &format!("--add-interface={INTERFACE_NAME}")],
    );
    runner.run("firewall-cmd", &["--reload"])
}

fn setup_docker_policies(runner: &CommandRunner) -> Result<()> {
    for proto in ["udp", "tcp"] {
        runner.run(
            "firewall-cmd",
            &["--zone=wg", &format!("--add-port=0-65535/{proto}"), "--permanent"],
        )?;
    }

    let existing = match runner.capture("firewall-cmd", &["--permanent", "--list-all-policies"]) {
        Ok(output) => output,
        Err(e) => {
            warn!("Error checking existing policies: {}", e);
            String::new()
        }
    };

    for (name, ingress, egress) in DOCKER_POLICIES {
        if existing.split_whitespace().any(|policy| policy == *name) {
            println!("[*] Deleting existing firewall policy: {name}");
            runner.run("firewall-cmd", &["--permanent", "--delete-policy", name])?;
        }
        println!("[*] Create firewall policy: {name}");
        runner.run("firewall-cmd", &["--permanent", "--new-policy", name])?;
        runner.run("firewall-cmd", &["--permanent", "--policy", name, "--set-target", "ACCEPT"])?;
        runner.run("firewall-cmd", &["--permanent", "--policy", name, "--add-ingress-zone", ingress])?;
        runner.run("firewall-cmd", &["--permanent", "--policy", name, "--add-egress-zone", egress])?;
    }
    runner.run("firewall-cmd", &["--reload"])
}

/// Interactive setup on the local host
pub async fn run_setup(wg_dir: &Path, options: &SetupOptions) -> Result<()> {
    if !nix::unistd::Uid::effective().is_root() {
        return Err(AdminError::InvalidInput("wg-setup must be run as root".into()));
    }

    let paths = WgPaths::new(wg_dir);
    let runner = CommandRunner::new();
    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());

    stop_running_service(&runner, &mut prompter)?;
    ensure_dir(&paths.dir)?;

    if options.install_packages {
        prompter.say("[*] Installing packages...")?;
        let mut args = vec!["install", "-y"];
        args.extend_from_slice(PACKAGES);
        runner.run("dnf", &args)?;
    }

    prompter.say("[*] Generating keys...")?;
    ensure_keypair(&runner, &paths.server_private, &paths.server_public)?;
    ensure_keypair(&runner, &paths.client_private, &paths.client_public)?;

    let endpoint = match detect_external_ip().await {
        Some(ip) => {
            prompter.say(&format!("[*] Detected external IP: {ip}"))?;
            ip
        }
        None => prompter.ask("Could not auto-detect external IP. Enter manually: ")?,
    };

    prompter.say("[*] Detecting interfaces with IP addresses...")?;
    let interfaces = parse_ip_addr_output(&runner.capture("ip", &["-o", "-4", "addr", "show"])?);
    let public_interface = prompter.choose_interface(&interfaces)?;
    prompter.say(&format!("[*] Selected interface: {public_interface}"))?;

    let subnet = prompter.choose_subnet()?;
    prompter.say(&format!(
        "[*] Using subnet {subnet}, server IP {}, client IP {}",
        subnet.server_ip(),
        subnet.client_ip()
    ))?;

    let listen_port = prompter.choose_port()?;
    prompter.say(&format!("[*] Using port {listen_port}"))?;

    let settings = TunnelSettings {
        subnet,
        listen_port,
        public_interface,
        endpoint,
    };

    prompter.say("[*] Writing server config...")?;
    let server_conf = render_server_conf(
        &settings,
        &read_key(&paths.server_private)?,
        &read_key(&paths.client_public)?,
    );
    write_private(&paths.server_conf, &server_conf)?;

    prompter.say("[*] Writing client config...")?;
    let client_conf = render_client_conf(
        &settings,
        &read_key(&paths.client_private)?,
        &read_key(&paths.server_public)?,
    );
    write_private(&paths.client_conf, &client_conf)?;

    let client_conf_path = paths.client_conf.to_string_lossy().to_string();
    let client_png_path = paths.client_png.to_string_lossy().to_string();

    prompter.say("[*] Generating QR code...")?;
    runner.run(
        "qrencode",
        &["-o", &client_png_path, "-t", "PNG", "-s", "10", "-r", &client_conf_path],
    )?;

    prompter.say("[*] Enabling IPv4 forwarding...")?;
    enable_forwarding(&runner)?;

    prompter.say("[*] Configuring firewalld...")?;
    setup_firewalld(&runner, &settings.public_interface, settings.listen_port)?;
    prompter.say("[+] Done!")?;

    if prompter.confirm("Would you like to allow traffic between docker containers and your wireguard VPN tunnel?")? {
        prompter.say("[*] Setting up firewall rules to allow WireGuard and Docker network traffic.")?;
        setup_docker_policies(&runner)?;
    }

    if prompter.confirm("Would you like to show the quick connect QR code now?")? {
        runner.run("qrencode", &["-t", "ANSIUTF8", "-r", &client_conf_path])?;
    }

    if prompter.confirm("Do you want to enable/start the service now?")? {
        prompter.say("[*] Enabling WireGuard service...")?;
        runner.run("systemctl", &["enable", "--now", SERVICE])?;
    }

    prompter.say(&format!("[*] Server config location: {}", paths.server_conf.display()))?;
    prompter.say(&format!("[*] Client config location: {client_conf_path}"))?;
    prompter.say(&format!("[*] Client QR PNG location: {client_png_path}"))?;

    let cwd = std::env::current_dir()?;
    for source in [&paths.client_conf, &paths.client_png] {
        if let Some(name) = source.file_name() {
            let dest = cwd.join(name);
            if dest != *source {
                fs::copy(source, &dest)?;
            }
        }
    }
    prompter.say(&format!("[*] Copied client1.conf and client1.png to {}", cwd.display()))?;
    prompter.say("[*] Scan client1.png with WireGuard mobile app or import client1.conf.")?;
    prompter.say("[*] Don't forget to forward the UDP port from your router to your server!")?;
    prompter.say("\n ======== WireGuard installation & setup complete ======== \n")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let paths = WgPaths::new(Path::new("/etc/wireguard"));
        assert_eq!(paths.server_conf, PathBuf::from("/etc/wireguard/wg0.conf"));
        assert_eq!(paths.client_png, PathBuf::from("/etc/wireguard/client1.png"));
        assert_eq!(paths.client_private, PathBuf::from("/etc/wireguard/client1_private.key"));
    }

    #[test]
    fn test_write_private_mode() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("wg0.conf");
        fs::write(&path, "old")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;

        write_private(&path, "[Interface]\n").unwrap();

        assert_eq!(fs::read_to_string(&path)?, "[Interface]\n");
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn test_existing_keypair_is_kept() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let private = temp_dir.path().join("server_private.key");
        let public = temp_dir.path().join("server_public.key");
        fs::write(&private, "PRIV=\n")?;
        fs::write(&public, "PUB=\n")?;

        // No `wg` needed when both keys exist
        ensure_keypair(&CommandRunner::quiet(), &private, &public).unwrap();

        assert_eq!(fs::read_to_string(&private)?, "PRIV=\n");
        assert_eq!(fs::read_to_string(&public)?, "PUB=\n");
        Ok(())
    }
}
