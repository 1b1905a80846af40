use crate::{
    config::{Config, MasterItems},
    grade::{DefectBank, DefectSet},
    normalize::{normalize_battery, normalize_cpu},
    remote::{
        ApiStatus, AssetRecord, AttributeMap, InventoryClient, Transport,
        asset::{BATTERY_WEAR, COSMETIC_GRADE, CPU_TYPE, DEFECT, FUNCTIONALITY_GRADE},
    },
    report::{ChassisType, ReportRecord},
};
use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Manufacturer whose remote model names are replaced with the report's.
const MODEL_CORRECTED_MANUFACTURER: &str = "LENOVO";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Updated,
    NoChangeNeeded,
    /// The remote has no asset under this UID.
    NotFound,
    /// The diagnostic attributes have not been linked to the asset yet.
    DiagnosticsPending,
    ReferenceDataRecovered,
    ReferenceDataFailed { reason: String },
    /// Any other non-200 exchange. Status 0 means the request never completed.
    TransientServerError { status: u16, message: String },
}

impl ReconcileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Updated | Self::NoChangeNeeded | Self::ReferenceDataRecovered
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::NoChangeNeeded => "no_change_needed",
            Self::NotFound => "not_found",
            Self::DiagnosticsPending => "diagnostics_pending",
            Self::ReferenceDataRecovered => "reference_data_recovered",
            Self::ReferenceDataFailed { .. } => "reference_data_failed",
            Self::TransientServerError { .. } => "transient_server_error",
        }
    }
}

pub struct Reconciler<T: Transport> {
    cfg: Config,
    bank: DefectBank,
    client: InventoryClient<T>,
}

impl<T: Transport> Reconciler<T> {
    pub fn new(cfg: &Config, bank: &DefectBank, transport: T) -> Self {
        Self {
            cfg: cfg.clone(),
            bank: bank.clone(),
            client: InventoryClient::new(transport),
        }
    }

    pub fn reconcile(&self, record: &ReportRecord) -> ReconcileOutcome {
        let uid = record.uid.as_str();

        let fetched = match self.client.get_asset(uid) {
            Ok(resp) => resp,
            Err(err) => return transport_failure(uid, err),
        };
        match fetched.kind() {
            ApiStatus::Ok => {}
            ApiStatus::NotFound => {
                error!(uid, "asset not found in inventory");
                return ReconcileOutcome::NotFound;
            }
            ApiStatus::BadRequest | ApiStatus::Other(_) => {
                return ReconcileOutcome::TransientServerError {
                    status: fetched.status,
                    message: fetched.message(),
                };
            }
        }

        let mut asset = match AssetRecord::from_json(fetched.body) {
            Ok(a) => a,
            Err(err) => {
                error!(uid, "unexpected asset body: {err:#}");
                return ReconcileOutcome::TransientServerError {
                    status: fetched.status,
                    message: format!("{err:#}"),
                };
            }
        };

        let cpu_raw = asset.attributes.get(CPU_TYPE);
        let wear_raw = asset.attributes.get(BATTERY_WEAR);
        if cpu_raw.is_none() && wear_raw.is_none() {
            warn!(
                uid,
                "diagnostic attributes not linked yet ({} attributes present)",
                asset.attributes.len()
            );
            return ReconcileOutcome::DiagnosticsPending;
        }

        let mut dirty = false;

        if asset.manufacturer() == MODEL_CORRECTED_MANUFACTURER {
            let model = record.model.to_uppercase();
            if model != asset.model() {
                info!(uid, "{MODEL_CORRECTED_MANUFACTURER} model correction: {} -> {model}", asset.model());
                asset.set_model(&model);
                dirty = true;
            }
        }

        if let Some(raw) = cpu_raw {
            let cpu = normalize_cpu(&raw);
            if cpu.changed {
                info!(uid, "reformatting CPU -> {}", cpu.value);
                asset.attributes.set(CPU_TYPE, &cpu.value);
                dirty = true;
            }
        }

        let mut defects = DefectSet::merge(&record.cosmetic_defects, &record.functional_defects);

        if let Some(raw) = wear_raw {
            let wear = normalize_battery(&raw);
            match wear.percent {
                None => warn!(uid, "battery wear level is unparsable: {raw:?}"),
                Some(percent) => {
                    if wear.changed {
                        info!(uid, "reformatting battery wear -> {}", wear.value);
                        asset.attributes.set(BATTERY_WEAR, &wear.value);
                        dirty = true;
                    }
                    let threshold = self.cfg.grading.battery_fail_threshold;
                    if defects.inject_low_battery(percent, threshold) {
                        info!(uid, "battery wear {percent}% is below {threshold}%; recording defect");
                    }
                }
            }
        }

        let grade = self.bank.grade(&defects);
        debug!(
            uid,
            cosmetic_weight = grade.cosmetic_weight,
            functional_weight = grade.functional_weight,
            "graded {:?}/{:?}",
            grade.cosmetic_grade,
            grade.functional_grade
        );

        let attrs = &mut asset.attributes;
        dirty |= self.set_guarded(attrs, uid, DEFECT, &defects.joined());
        dirty |= self.set_guarded(attrs, uid, COSMETIC_GRADE, grade.cosmetic_grade.as_str());
        dirty |= self.set_guarded(attrs, uid, FUNCTIONALITY_GRADE, grade.functional_grade.as_str());

        if !dirty {
            info!(uid, "no corrections to be made");
            return ReconcileOutcome::NoChangeNeeded;
        }

        self.push(record, &asset)
    }

    /// Writes an attribute unless it already exists and overwriting is off.
    fn set_guarded(&self, attrs: &mut AttributeMap, uid: &str, name: &str, value: &str) -> bool {
        if attrs.contains(name) && !self.cfg.grading.overwrite_existing {
            debug!(uid, "{name} already set; overwrite disabled");
            return false;
        }
        let changed = attrs.set(name, value);
        if changed {
            info!(uid, "setting {name} = {value}");
        }
        changed
    }

    fn push(&self, record: &ReportRecord, asset: &AssetRecord) -> ReconcileOutcome {
        let uid = record.uid.as_str();
        let body = asset.to_json();

        let resp = match self.client.put_asset(uid, &body) {
            Ok(resp) => resp,
            Err(err) => return transport_failure(uid, err),
        };
        match resp.kind() {
            ApiStatus::Ok => {
                info!(uid, "updated successfully");
                ReconcileOutcome::Updated
            }
            ApiStatus::NotFound => {
                warn!(uid, "master item not found; creating reference data");
                match self.recover_reference_data(record) {
                    Ok(()) => self.retry_push(uid, &body),
                    Err(err) => {
                        error!(uid, "reference data recovery failed: {err:#}");
                        ReconcileOutcome::ReferenceDataFailed {
                            reason: format!("{err:#}"),
                        }
                    }
                }
            }
            ApiStatus::BadRequest | ApiStatus::Other(_) => ReconcileOutcome::TransientServerError {
                status: resp.status,
                message: resp.message(),
            },
        }
    }

    fn retry_push(&self, uid: &str, body: &Value) -> ReconcileOutcome {
        match self.client.put_asset(uid, body) {
            Ok(resp) if resp.kind() == ApiStatus::Ok => {
                info!(uid, "updated successfully after creating reference data");
                ReconcileOutcome::ReferenceDataRecovered
            }
            Ok(resp) => {
                error!(uid, "update still rejected after creating reference data [{}]", resp.status);
                ReconcileOutcome::ReferenceDataFailed {
                    reason: format!("retry push returned {}: {}", resp.status, resp.message()),
                }
            }
            Err(err) => ReconcileOutcome::ReferenceDataFailed {
                reason: format!("{err:#}"),
            },
        }
    }

    fn recover_reference_data(&self, record: &ReportRecord) -> Result<()> {
        let manufacturer = record.manufacturer.trim();
        if manufacturer.is_empty() {
            bail!("report has no manufacturer to create reference data from");
        }

        let manufacturer_id = match self.lookup_manufacturer(manufacturer)? {
            Some(id) => id,
            None => {
                let created = self
                    .client
                    .create_manufacturer(manufacturer)
                    .with_context(|| format!("creating manufacturer {manufacturer}"))?;
                if created.kind() != ApiStatus::Ok {
                    bail!(
                        "creating manufacturer {manufacturer} returned {}: {}",
                        created.status,
                        created.message()
                    );
                }
                info!(uid = record.uid.as_str(), "created manufacturer {manufacturer}");
                self.lookup_manufacturer(manufacturer)?.ok_or_else(|| {
                    anyhow!("manufacturer {manufacturer} still missing after creation")
                })?
            }
        };

        let item = master_item_payload(&self.cfg.master_items, record, manufacturer_id);
        let resp = self
            .client
            .create_item_master(&item)
            .with_context(|| format!("creating master item for {}", record.model))?;
        if resp.kind() != ApiStatus::Ok {
            bail!(
                "creating master item for {} returned {}: {}",
                record.model,
                resp.status,
                resp.message()
            );
        }
        info!(uid = record.uid.as_str(), "master item added for {}", record.model);
        Ok(())
    }

    /// Id of the first manufacturer matching the search phrase, if any.
    fn lookup_manufacturer(&self, phrase: &str) -> Result<Option<Value>> {
        let resp = self
            .client
            .find_manufacturer(phrase)
            .with_context(|| format!("looking up manufacturer {phrase}"))?;
        match resp.kind() {
            ApiStatus::Ok => Ok(resp
                .body
                .get("items")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get("id"))
                .filter(|id| !id.is_null())
                .cloned()),
            ApiStatus::NotFound => Ok(None),
            ApiStatus::BadRequest | ApiStatus::Other(_) => bail!(
                "manufacturer lookup for {phrase} returned {}: {}",
                resp.status,
                resp.message()
            ),
        }
    }
}

fn transport_failure(uid: &str, err: anyhow::Error) -> ReconcileOutcome {
    error!(uid, "request failed: {err:#}");
    ReconcileOutcome::TransientServerError {
        status: 0,
        message: format!("{err:#}"),
    }
}

pub fn template_for<'a>(templates: &'a MasterItems, chassis: &ChassisType) -> &'a Map<String, Value> {
    match chassis {
        ChassisType::Laptop | ChassisType::Notebook | ChassisType::Convertible => &templates.laptop,
        ChassisType::Desktop => &templates.desktop,
        ChassisType::Other(_) => &templates.laptop,
    }
}

/// Fills a copy of the chassis template for `POST ItemMaster`.
pub fn master_item_payload(
    templates: &MasterItems,
    record: &ReportRecord,
    manufacturer_id: Value,
) -> Value {
    let mut item = template_for(templates, &record.chassis_type).clone();
    item.insert("itemNumber".into(), Value::String(record.model.clone()));
    item.insert(
        "manufacturer".into(),
        Value::String(record.manufacturer.clone()),
    );
    item.insert("manufacturerId".into(), manufacturer_id);
    item.insert(
        "title".into(),
        Value::String(format!("{} {}", record.model, record.manufacturer)),
    );
    Value::Object(item)
}
