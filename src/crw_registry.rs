// Lookup of models by name

use crate::crw_blocks::{
    InterExpBlockAcqRate, InterExpBlockCollectionRate, IntraExpBlockAcqRate, IntraExpBlockCollectionRate,
};
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_homing_time::{IntraExpHomingTime1Robot, IntraExpHomingTimeNRobots, InterExpHomingTimeNRobots};
use crate::crw_interface::{InterExpModel, IntraExpModel, ModelCategory};
use crate::crw_interference::{
    InterExpRobotInterferenceRateNRobots, InterExpRobotInterferenceTimeNRobots,
    IntraExpRobotInterferenceRateNRobots, IntraExpRobotInterferenceTimeNRobots,
    IntraExpWallInterferenceRate1Robot,
};
use crate::crw_ode_models::{InterExpOdeNRobots, InterExpOdeWrapper, IntraExpOde1Robot, IntraExpOdeNRobots};
use crate::crw_perf_measures::{InterExpRawPerf, InterExpScalability, InterExpSelfOrg};
use crate::{crw_blocks, crw_homing_time, crw_interference, crw_ode_models, crw_perf_measures};

/// Every model name of `category`, grouped by model module
pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    let mut names = crw_blocks::available_models(category);
    names.extend(crw_interference::available_models(category));
    names.extend(crw_homing_time::available_models(category));
    names.extend(crw_ode_models::available_models(category));
    names.extend(crw_perf_measures::available_models(category));
    names
}

pub fn build_intra(name: &str) -> ModelResult<Box<dyn IntraExpModel>> {
    let model: Box<dyn IntraExpModel> = match name {
        "IntraExp_BlockAcqRate_NRobots" => Box::new(IntraExpBlockAcqRate),
        "IntraExp_BlockCollectionRate_NRobots" => Box::new(IntraExpBlockCollectionRate),
        "IntraExp_WallInterferenceRate_1Robot" => Box::new(IntraExpWallInterferenceRate1Robot),
        "IntraExp_RobotInterferenceRate_NRobots" => Box::new(IntraExpRobotInterferenceRateNRobots),
        "IntraExp_RobotInterferenceTime_NRobots" => Box::new(IntraExpRobotInterferenceTimeNRobots),
        "IntraExp_HomingTime_1Robot" => Box::new(IntraExpHomingTime1Robot),
        "IntraExp_HomingTime_NRobots" => Box::new(IntraExpHomingTimeNRobots),
        "IntraExp_ODE_1Robot" => Box::new(IntraExpOde1Robot),
        "IntraExp_ODE_NRobots" => Box::new(IntraExpOdeNRobots),
        _ => return Err(ModelError::UnknownModel(name.to_string())),
    };
    Ok(model)
}

pub fn build_inter(name: &str) -> ModelResult<Box<dyn InterExpModel>> {
    let model: Box<dyn InterExpModel> = match name {
        "InterExp_BlockAcqRate_NRobots" => Box::new(InterExpBlockAcqRate),
        "InterExp_BlockCollectionRate_NRobots" => Box::new(InterExpBlockCollectionRate),
        "InterExp_RobotInterferenceRate_NRobots" => Box::new(InterExpRobotInterferenceRateNRobots),
        "InterExp_RobotInterferenceTime_NRobots" => Box::new(InterExpRobotInterferenceTimeNRobots),
        "InterExp_HomingTime_NRobots" => Box::new(InterExpHomingTimeNRobots),
        "InterExp_ODE_NRobots" => Box::new(InterExpOdeNRobots),
        "InterExp_ODEWrapper_NRobots" => Box::new(InterExpOdeWrapper),
        "InterExp_RawPerf_NRobots" => Box::new(InterExpRawPerf),
        "InterExp_Scalability_NRobots" => Box::new(InterExpScalability),
        "InterExp_SelfOrg_NRobots" => Box::new(InterExpSelfOrg),
        _ => return Err(ModelError::UnknownModel(name.to_string())),
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_model_builds_under_its_name() {
        for name in available_models(ModelCategory::Intra) {
            let model = build_intra(name).unwrap();
            assert_eq!(model.name(), name);
            assert_eq!(model.target_csv_stems().len(), model.legend_names().len());
        }
        for name in available_models(ModelCategory::Inter) {
            let model = build_inter(name).unwrap();
            assert_eq!(model.name(), name);
            assert_eq!(model.target_csv_stems().len(), model.legend_names().len());
        }
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(build_intra("IntraExp_Nope"), Err(ModelError::UnknownModel(_))));
        assert!(matches!(
            build_inter("IntraExp_BlockAcqRate_NRobots"),
            Err(ModelError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_no_duplicate_names() {
        let mut names = available_models(ModelCategory::Intra);
        names.extend(available_models(ModelCategory::Inter));
        let unique: hashbrown::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
