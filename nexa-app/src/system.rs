//! Host-backed action executor.
//!
//! URL intents go through the platform opener, device status is read from
//! sysfs and `df`, and network lookups are delegated to `HttpLookup`.

use std::path::{Path, PathBuf};
use std::process::Command;

use nexa_core::actions::{platform_url, play_url, search_url};
use nexa_core::{ActionExecutor, HttpLookup, NexaError, Result};
use tracing::debug;

pub struct SystemActions {
    lookup: Option<HttpLookup>,
    trash_dir: Option<PathBuf>,
}

impl SystemActions {
    pub fn new(lookup: Option<HttpLookup>) -> Self {
        Self {
            lookup,
            trash_dir: default_trash_dir(),
        }
    }

    fn lookup(&self) -> Result<&HttpLookup> {
        self.lookup
            .as_ref()
            .ok_or_else(|| NexaError::upstream("network lookups are disabled"))
    }
}

impl ActionExecutor for SystemActions {
    fn weather(&self, city: &str) -> Result<Vec<String>> {
        self.lookup()?.weather(city)
    }

    fn news(&self) -> Result<Vec<String>> {
        self.lookup()?.news()
    }

    fn joke(&self) -> Result<String> {
        self.lookup()?.joke()
    }

    fn quote(&self) -> Result<String> {
        self.lookup()?.quote()
    }

    fn stock(&self, symbol: &str) -> Result<String> {
        self.lookup()?.stock(symbol)
    }

    fn recipes(&self, ingredient: &str) -> Result<Vec<String>> {
        self.lookup()?.recipes(ingredient)
    }

    fn play(&self, query: &str) -> Result<()> {
        open_url(&play_url(query))
    }

    fn search(&self, query: &str) -> Result<()> {
        open_url(&search_url(query))
    }

    fn open_platform(&self, platform: &str) -> Result<bool> {
        match platform_url(platform) {
            Some(url) => open_url(url).map(|_| true),
            None => Ok(false),
        }
    }

    fn battery(&self) -> Result<String> {
        let supply = find_battery(Path::new("/sys/class/power_supply"))
            .ok_or_else(|| NexaError::upstream("no battery found"))?;
        let capacity = std::fs::read_to_string(supply.join("capacity"))?;
        let status = std::fs::read_to_string(supply.join("status")).unwrap_or_default();
        format_battery(&capacity, &status)
    }

    fn storage(&self) -> Result<String> {
        let table = run_df(&["-P", "-k"])?;
        let volumes = parse_df(&table);
        if volumes.is_empty() {
            return Err(NexaError::upstream("df reported no volumes"));
        }
        Ok(volumes
            .iter()
            .map(|v| {
                format!(
                    "Drive {}: {}% used, {} GB free",
                    v.mount,
                    v.used_percent(),
                    to_gb(v.available_kb)
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn disk_usage(&self) -> Result<String> {
        let table = run_df(&["-P", "-k", "/"])?;
        let root = parse_df(&table)
            .into_iter()
            .next()
            .ok_or_else(|| NexaError::upstream("df reported no root volume"))?;
        Ok(format!(
            "Total: {} GB, Used: {} GB, Free: {} GB",
            to_gb(root.total_kb),
            to_gb(root.used_kb),
            to_gb(root.available_kb)
        ))
    }

    fn empty_recycle_bin(&self) -> Result<String> {
        let trash = self
            .trash_dir
            .as_deref()
            .ok_or_else(|| NexaError::upstream("no trash directory"))?;
        let removed = clear_trash(trash)?;
        debug!(removed, trash = %trash.display(), "emptied trash");
        Ok("Recycle bin cleared.".into())
    }
}

fn open_url(url: &str) -> Result<()> {
    debug!(url, "opening");
    let status = opener_command(url).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(NexaError::upstream(format!("opener exited with {status}")))
    }
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

fn find_battery(root: &Path) -> Option<PathBuf> {
    let mut batteries: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("BAT"))
        })
        .collect();
    batteries.sort();
    batteries.into_iter().next()
}

fn format_battery(capacity: &str, status: &str) -> Result<String> {
    let percent: u8 = capacity
        .trim()
        .parse()
        .map_err(|_| NexaError::upstream(format!("unreadable battery capacity {capacity:?}")))?;
    let status = status.trim();
    let plugged = matches!(status, "Charging" | "Full" | "Not charging");
    Ok(format!("Battery percentage: {percent}%, Plugged in: {plugged}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Volume {
    mount: String,
    total_kb: u64,
    used_kb: u64,
    available_kb: u64,
}

impl Volume {
    fn used_percent(&self) -> u64 {
        if self.total_kb == 0 {
            0
        } else {
            (self.used_kb * 100 + self.total_kb / 2) / self.total_kb
        }
    }
}

fn run_df(args: &[&str]) -> Result<String> {
    let out = Command::new("df").args(args).output()?;
    if !out.status.success() {
        return Err(NexaError::upstream(format!("df exited with {}", out.status)));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// POSIX `df -P -k` output. Pseudo filesystems with zero size are skipped.
fn parse_df(table: &str) -> Vec<Volume> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 6 {
                return None;
            }
            let total_kb = cols[1].parse().ok()?;
            let used_kb = cols[2].parse().ok()?;
            let available_kb = cols[3].parse().ok()?;
            if total_kb == 0 {
                return None;
            }
            Some(Volume {
                mount: cols[5..].join(" "),
                total_kb,
                used_kb,
                available_kb,
            })
        })
        .collect()
}

fn to_gb(kb: u64) -> u64 {
    kb / (1024 * 1024)
}

fn default_trash_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .map(|data| data.join("Trash"))
}

/// Removes everything under `files/` and `info/`; returns the entry count.
fn clear_trash(trash: &Path) -> Result<usize> {
    let mut removed = 0;
    for sub in ["files", "info"] {
        let dir = trash.join(sub);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            removed += 1;
        }
    }
    Ok(removed)
}
