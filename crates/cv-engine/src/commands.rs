//! Remote command vocabulary for packages and services
//!
//! Targets Debian-family hosts: dpkg/apt for packages, systemd for services.

use cv_core::shell::quote;
use cv_core::traits::CommandOutput;

/// `dpkg-query` status line of an installed package
const INSTALLED_STATUS: &str = "install ok installed";

pub fn package_status(name: &str) -> String {
    format!("dpkg-query -W -f='${{Status}}' {}", quote(name))
}

/// Interpret the output of [`package_status`]. A nonzero exit means the
/// package is unknown to dpkg, which is "not installed".
pub fn is_installed(output: &CommandOutput) -> bool {
    output.success() && output.stdout_str().contains(INSTALLED_STATUS)
}

pub fn package_install(name: &str) -> String {
    format!(
        "DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
        quote(name)
    )
}

pub fn package_remove(name: &str) -> String {
    format!(
        "DEBIAN_FRONTEND=noninteractive apt-get purge -y {} && apt-get autoremove -y",
        quote(name)
    )
}

const UNIT_SUFFIXES: &[&str] = &[".service", ".socket", ".timer", ".target", ".mount", ".path"];

/// Systemd unit name; names without a unit suffix get `.service`
pub fn unit_name(name: &str) -> String {
    if UNIT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        name.to_string()
    } else {
        format!("{}.service", name)
    }
}

pub fn unit_exists(name: &str) -> String {
    format!(
        "systemctl list-unit-files --no-legend --no-pager {}",
        quote(&unit_name(name))
    )
}

/// Interpret the output of [`unit_exists`]
pub fn is_unit_listed(output: &CommandOutput) -> bool {
    output.success() && !output.stdout_str().trim().is_empty()
}

pub fn service_is_active(name: &str) -> String {
    format!("systemctl is-active --quiet {}", quote(&unit_name(name)))
}

pub fn service_action(verb: &str, name: &str) -> String {
    format!("systemctl {} {}", verb, quote(&unit_name(name)))
}
