//! The thin pipeline that actually drives a [`SimpleRuntime`] from a scape:
//! resolve this tick's sensors and actuators against the morphology, read
//! sensor input, step the substrate, then write the resulting weights back
//! out through the actuators.

use protogonos_substrate::SimpleRuntime;
use tracing::debug;

use crate::actuator::Actuator;
use crate::morphology::Morphology;
use crate::registry::ComponentRegistry;
use crate::sensor::Sensor;
use crate::CortexError;

pub async fn run_tick(
    runtime: &mut SimpleRuntime,
    morphology: &dyn Morphology,
    sensors: &ComponentRegistry<dyn Sensor>,
    actuators: &ComponentRegistry<dyn Actuator>,
) -> Result<Vec<f64>, CortexError> {
    let mut inputs = Vec::new();
    for name in morphology.sensors() {
        let sensor = sensors.resolve(name, morphology.sensors())?;
        inputs.extend(sensor.read()?);
    }

    let weights = runtime.step(&inputs, None).await?;

    for name in morphology.actuators() {
        let actuator = actuators.resolve(name, morphology.actuators())?;
        actuator.write(&weights)?;
    }

    debug!(morphology = morphology.name(), inputs = inputs.len(), "tick completed");
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::FixedMorphology;
    use protogonos_types::{Parameters, Spec};
    use std::sync::{Arc, Mutex};

    struct ConstantSensor(f64);

    impl Sensor for ConstantSensor {
        fn name(&self) -> &str {
            "input"
        }

        fn read(&self) -> Result<Vec<f64>, CortexError> {
            Ok(vec![self.0])
        }
    }

    struct RecordingActuator(Mutex<Vec<f64>>);

    impl Actuator for RecordingActuator {
        fn name(&self) -> &str {
            "output"
        }

        fn write(&self, values: &[f64]) -> Result<(), CortexError> {
            *self.0.lock().unwrap() = values.to_vec();
            Ok(())
        }
    }

    #[tokio::test]
    async fn drives_one_full_sensor_to_actuator_cycle() {
        let spec = Spec {
            cpp_name: "set_weight".to_string(),
            cep_name: Some("delta_weight".to_string()),
            parameters: Parameters::new().with("scale", 0.5),
            ..Default::default()
        };
        let mut runtime = SimpleRuntime::new(spec, 1).await.unwrap();

        let morphology = FixedMorphology::new("m", "scape", vec!["input".into()], vec!["output".into()]);
        let sensors: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        sensors.register("input", Arc::new(ConstantSensor(2.0))).unwrap();
        let actuators: ComponentRegistry<dyn Actuator> = ComponentRegistry::new();
        let recorder = Arc::new(RecordingActuator(Mutex::new(Vec::new())));
        actuators.register("output", recorder.clone()).unwrap();

        let weights = run_tick(&mut runtime, &morphology, &sensors, &actuators).await.unwrap();
        assert_eq!(weights, recorder.0.lock().unwrap().clone());
        assert_eq!(weights, vec![0.5]);
    }
}
