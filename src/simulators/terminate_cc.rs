//! `terminate_column_chromatography`: single short delay;
//! machine → `idle`, cartridges → `used`, tube rack → `contaminated,
//! description="used"`, ext module stays `using` with a description noting
//! the mounted cartridges; captures one `screen` image.

use crate::simulators::context::SimContext;
use crate::types::command::TerminateCcParams;
use crate::types::{
    CartridgeProperties, CartridgeState, CcMachineProperties, DeviceProperties, DeviceState, EntityKind, EntityUpdate, ResultEnvelope,
    TubeRackProperties, TubeRackState,
};

pub async fn simulate(task_id: &str, params: TerminateCcParams, ctx: &SimContext) -> ResultEnvelope {
    let delay = ctx.delay(2.0, 5.0).await;
    ctx.sleep(delay).await;

    let machine_id = params.device_id.clone().unwrap_or_else(|| format!("cc_machine_{}", params.work_station));
    let machine_idle = EntityUpdate::ColumnChromatographyMachine {
        id: machine_id,
        properties: CcMachineProperties { state: Some(DeviceState::Idle), location: Some(params.work_station.clone()), ..Default::default() },
    };

    let silica_id =
        ctx.find_entity_at(EntityKind::SilicaCartridge, &params.work_station).await.map(|e| e.id).unwrap_or_else(|| format!("{}_silica", params.work_station));
    let silica_used = EntityUpdate::SilicaCartridge {
        id: silica_id,
        properties: CartridgeProperties { state: Some(CartridgeState::Used), location: Some(params.work_station.clone()), description: None },
    };

    let sample_id =
        ctx.find_entity_at(EntityKind::SampleCartridge, &params.work_station).await.map(|e| e.id).unwrap_or_else(|| format!("{}_sample", params.work_station));
    let sample_used = EntityUpdate::SampleCartridge {
        id: sample_id,
        properties: CartridgeProperties { state: Some(CartridgeState::Used), location: Some(params.work_station.clone()), description: None },
    };

    let tube_rack_id =
        ctx.find_entity_at(EntityKind::TubeRack, &params.work_station).await.map(|e| e.id).unwrap_or_else(|| "tube_rack_001".to_string());
    let tube_rack_contaminated = EntityUpdate::TubeRack {
        id: tube_rack_id,
        properties: TubeRackProperties { state: Some(TubeRackState::Contaminated), location: Some(params.work_station.clone()), description: Some("used".to_string()) },
    };

    let ext_module_id = format!("ccs_ext_module_{}", params.work_station);
    let ext_module = EntityUpdate::CcsExtModule {
        id: ext_module_id.clone(),
        properties: DeviceProperties {
            state: Some(DeviceState::Using),
            location: Some(params.work_station.clone()),
            description: Some("mounted cartridges pending removal".to_string()),
        },
    };

    let image = ctx.image(&params.work_station, &ext_module_id, "ccs_ext_module", "screen").await;

    ResultEnvelope::success_with_images(
        task_id,
        vec![machine_idle, silica_used, sample_used, tube_rack_contaminated, ext_module],
        vec![image],
    )
}
