//! Firmware updater: HPM upgrade and activation through the shelf manager

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::UpdateConfig;
use crate::error::{IpmcError, Result};
use crate::ipmitool::{self, Ipmitool};
use crate::target::{parse_shelf_address, IpmbAddress};

/// What happened to one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    /// Firmware uploaded and activated
    Activated,
    /// FRU check failed; nothing was sent to the IPMC
    Skipped(String),
    /// Upload failed; activation was not attempted
    UpgradeFailed(String),
    /// Upload succeeded but activation failed
    ActivateFailed(String),
}

#[derive(Debug, Clone)]
pub struct SlotOutcome {
    pub slot: IpmbAddress,
    pub status: SlotStatus,
}

impl fmt::Display for SlotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            SlotStatus::Activated => write!(f, "{}: activated", self.slot),
            SlotStatus::Skipped(why) => write!(f, "{}: skipped ({})", self.slot, why),
            SlotStatus::UpgradeFailed(why) => write!(f, "{}: upgrade failed ({})", self.slot, why),
            SlotStatus::ActivateFailed(why) => write!(f, "{}: activation failed ({})", self.slot, why),
        }
    }
}

/// Per-slot results of an updater run, in the order the slots were given
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub outcomes: Vec<SlotOutcome>,
}

impl UpdateReport {
    /// True when every slot ended up activated
    pub fn is_success(&self) -> bool {
        !self.outcomes.is_empty()
            && self.outcomes.iter().all(|o| o.status == SlotStatus::Activated)
    }
}

/// Validated updater inputs
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub upgrade_file: PathBuf,
    pub slots: Vec<IpmbAddress>,
    pub check_fru: bool,
    pub activate_delay: Duration,
}

/// Check the upgrade file is readable before anything touches the shelf
pub fn check_upgrade_file(path: &Path) -> Result<PathBuf> {
    let not_found = |reason: String| IpmcError::UpgradeFileNotFound {
        path: path.to_path_buf(),
        reason,
    };
    let file = std::fs::File::open(path).map_err(|e| not_found(e.to_string()))?;
    let metadata = file.metadata().map_err(|e| not_found(e.to_string()))?;
    if !metadata.is_file() {
        return Err(not_found("not a regular file".to_string()));
    }
    Ok(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Validate all inputs, locate ipmitool and update every slot.
pub async fn update(config: &UpdateConfig) -> Result<UpdateReport> {
    let upgrade_file = check_upgrade_file(&config.upgrade_file)?;
    let shelf = parse_shelf_address(&config.shelf)?;
    let slots = config
        .slots
        .iter()
        .map(|s| IpmbAddress::parse(s))
        .collect::<Result<Vec<_>>>()?;
    if slots.is_empty() {
        return Err(IpmcError::InvalidIpmbAddress("no slot address given".to_string()));
    }

    let program = config.find_ipmitool().map_err(IpmcError::IpmitoolFailed)?;
    let tool = Ipmitool::new(program, shelf);

    let plan = UpdatePlan {
        upgrade_file,
        slots,
        check_fru: config.check_fru,
        activate_delay: config.activate_delay,
    };
    Ok(run_plan(&tool, &plan).await)
}

/// Update the slots one after another; a failing slot does not stop the rest.
pub async fn run_plan(tool: &Ipmitool, plan: &UpdatePlan) -> UpdateReport {
    let mut report = UpdateReport::default();

    for &slot in &plan.slots {
        let status = update_slot(tool, plan, slot).await;
        match &status {
            SlotStatus::Activated => info!("Slot {} updated and activated", slot),
            SlotStatus::Skipped(why) => warn!("Skipping {}: {}", slot, why),
            other => error!("Slot {}: {:?}", slot, other),
        }
        report.outcomes.push(SlotOutcome { slot, status });
    }

    report
}

async fn update_slot(tool: &Ipmitool, plan: &UpdatePlan, slot: IpmbAddress) -> SlotStatus {
    if plan.check_fru {
        info!("Validating IPMC information for slot: {}", slot);
        let checked = match tool.fru(slot).await {
            Ok(output) => ipmitool::validate_fru(slot, &output),
            Err(e) => Err(e),
        };
        if let Err(e) = checked {
            return SlotStatus::Skipped(e.to_string());
        }
    }

    info!("Updating and activating the IPMC firmware");
    info!("Shelf         : {}", tool.shelf());
    info!("Slot          : {}", slot);
    info!("Upgrade file  : {}", plan.upgrade_file.display());

    if let Err(e) = tool.hpm_upgrade(slot, &plan.upgrade_file).await {
        return SlotStatus::UpgradeFailed(e.to_string());
    }

    if !plan.activate_delay.is_zero() {
        tokio::time::sleep(plan.activate_delay).await;
    }

    match tool.hpm_activate(slot).await {
        Ok(()) => SlotStatus::Activated,
        Err(e) => SlotStatus::ActivateFailed(e.to_string()),
    }
}
