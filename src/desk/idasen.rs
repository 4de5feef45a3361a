//! Linak / IKEA Idasen desk driver over btleplug

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tokio::time::Instant;
use uuid::Uuid;

use super::protocol::{self, DeskPosition};
use super::{DeskControl, DeskError};
use crate::ble;
use crate::config::{BleConfig, DeskConfig};

pub struct IdasenDesk {
    adapter_index: usize,
    lookup_timeout: Duration,
    connect_timeout: Duration,
    move_timeout: Duration,
}

struct DeskCharacteristics {
    command: Characteristic,
    height_speed: Characteristic,
    reference_input: Characteristic,
}

impl IdasenDesk {
    pub fn new(ble: &BleConfig, desk: &DeskConfig) -> Self {
        Self {
            adapter_index: ble.adapter_index,
            lookup_timeout: ble.lookup_timeout(),
            connect_timeout: ble.connect_timeout(),
            move_timeout: desk.move_timeout(),
        }
    }

    async fn characteristics(&self, peripheral: &Peripheral) -> Result<DeskCharacteristics, DeskError> {
        peripheral.discover_services().await?;

        if !peripheral
            .services()
            .iter()
            .any(|s| s.uuid == protocol::CONTROL_SERVICE_UUID)
        {
            tracing::warn!("Control service {} not advertised", protocol::CONTROL_SERVICE_UUID);
        }

        let available = peripheral.characteristics();
        let find = |uuid: Uuid| {
            available
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or(DeskError::MissingCharacteristic(uuid))
        };

        Ok(DeskCharacteristics {
            command: find(protocol::COMMAND_UUID)?,
            height_speed: find(protocol::HEIGHT_SPEED_UUID)?,
            reference_input: find(protocol::REFERENCE_INPUT_UUID)?,
        })
    }

    /// Run a move, sending a best-effort stop if it fails part way
    async fn drive(
        &self,
        link: &dyn DeskLink,
        chars: &DeskCharacteristics,
        target_m: f64,
        target: &[u8; 2],
    ) -> Result<(), DeskError> {
        let result = self.run_move(link, chars, target_m, target).await;
        if result.is_err() {
            if let Err(e) = stop(link, chars).await {
                tracing::warn!("Failed to stop desk after error: {}", e);
            }
        }
        result
    }

    async fn run_move(
        &self,
        link: &dyn DeskLink,
        chars: &DeskCharacteristics,
        target_m: f64,
        target: &[u8; 2],
    ) -> Result<(), DeskError> {
        let start = position(link, chars).await?;
        tracing::info!("Moving desk from {:.4} m to {:.4} m", start.height_m, target_m);

        link.write_char(&chars.command, &protocol::COMMAND_WAKEUP, WriteType::WithResponse)
            .await?;
        stop(link, chars).await?;

        let deadline = Instant::now() + self.move_timeout;
        let mut started = false;

        loop {
            link.write_char(&chars.reference_input, target, WriteType::WithoutResponse)
                .await?;
            tokio::time::sleep(protocol::MOVE_INTERVAL).await;

            let position = position(link, chars).await?;
            tracing::debug!(
                "Desk at {:.4} m, speed {:.4} m/s",
                position.height_m,
                position.speed
            );

            if position.speed != 0.0 {
                started = true;
            }
            if protocol::movement_finished(&position, target_m, started) {
                tracing::info!("Desk stopped at {:.4} m", position.height_m);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeskError::Timeout(self.move_timeout));
            }
        }
    }
}

/// Characteristic access used while moving the desk
#[async_trait]
trait DeskLink: Send + Sync {
    async fn write_char(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<(), DeskError>;

    async fn read_char(&self, characteristic: &Characteristic) -> Result<Vec<u8>, DeskError>;
}

#[async_trait]
impl DeskLink for Peripheral {
    async fn write_char(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<(), DeskError> {
        self.write(characteristic, data, write_type).await?;
        Ok(())
    }

    async fn read_char(&self, characteristic: &Characteristic) -> Result<Vec<u8>, DeskError> {
        Ok(self.read(characteristic).await?)
    }
}

async fn position(
    link: &dyn DeskLink,
    chars: &DeskCharacteristics,
) -> Result<DeskPosition, DeskError> {
    let data = link.read_char(&chars.height_speed).await?;
    protocol::decode_position(&data)
}

async fn stop(link: &dyn DeskLink, chars: &DeskCharacteristics) -> Result<(), DeskError> {
    link.write_char(&chars.command, &protocol::COMMAND_STOP, WriteType::WithoutResponse)
        .await?;
    link.write_char(
        &chars.reference_input,
        &protocol::REFERENCE_INPUT_STOP,
        WriteType::WithoutResponse,
    )
    .await
}

#[async_trait]
impl DeskControl for IdasenDesk {
    async fn move_to_target(&self, address: &str, height_m: f64) -> Result<(), DeskError> {
        let target = protocol::encode_target(height_m)?;

        let adapter = ble::adapter(self.adapter_index).await?;
        let peripheral = ble::find_peripheral(&adapter, address, self.lookup_timeout).await?;

        let was_connected = peripheral.is_connected().await?;
        if !was_connected {
            ble::connect_with_timeout(&peripheral, self.connect_timeout).await?;
        }

        let result = match self.characteristics(&peripheral).await {
            Ok(chars) => self.drive(&peripheral, &chars, height_m, &target).await,
            Err(e) => Err(e),
        };

        if !was_connected {
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!("Failed to disconnect desk {}: {}", address, e);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    use btleplug::api::CharPropFlags;

    /// Link that replays height/speed readings and records writes
    struct FakeLink {
        readings: Mutex<VecDeque<Vec<u8>>>,
        writes: Mutex<Vec<(Uuid, Vec<u8>)>>,
    }

    impl FakeLink {
        fn new(readings: Vec<Vec<u8>>) -> Self {
            Self {
                readings: Mutex::new(readings.into()),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn last_writes(&self, n: usize) -> Vec<(Uuid, Vec<u8>)> {
            let writes = self.writes.lock().unwrap();
            writes[writes.len() - n..].to_vec()
        }
    }

    #[async_trait]
    impl DeskLink for FakeLink {
        async fn write_char(
            &self,
            characteristic: &Characteristic,
            data: &[u8],
            _write_type: WriteType,
        ) -> Result<(), DeskError> {
            self.writes
                .lock()
                .unwrap()
                .push((characteristic.uuid, data.to_vec()));
            Ok(())
        }

        // Running out of readings behaves like a dropped connection
        async fn read_char(&self, _characteristic: &Characteristic) -> Result<Vec<u8>, DeskError> {
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(DeskError::Btleplug(btleplug::Error::NotConnected))
        }
    }

    fn characteristic(uuid: Uuid) -> Characteristic {
        Characteristic {
            uuid,
            service_uuid: protocol::CONTROL_SERVICE_UUID,
            properties: CharPropFlags::empty(),
            descriptors: BTreeSet::new(),
        }
    }

    fn desk_characteristics() -> DeskCharacteristics {
        DeskCharacteristics {
            command: characteristic(protocol::COMMAND_UUID),
            height_speed: characteristic(protocol::HEIGHT_SPEED_UUID),
            reference_input: characteristic(protocol::REFERENCE_INPUT_UUID),
        }
    }

    fn reading(raw_height: u16, raw_speed: i16) -> Vec<u8> {
        let mut data = raw_height.to_le_bytes().to_vec();
        data.extend_from_slice(&raw_speed.to_le_bytes());
        data
    }

    fn desk(move_timeout_secs: u64) -> IdasenDesk {
        IdasenDesk::new(&BleConfig::default(), &DeskConfig { move_timeout_secs })
    }

    fn stop_writes() -> Vec<(Uuid, Vec<u8>)> {
        vec![
            (protocol::COMMAND_UUID, protocol::COMMAND_STOP.to_vec()),
            (protocol::REFERENCE_INPUT_UUID, protocol::REFERENCE_INPUT_STOP.to_vec()),
        ]
    }

    #[tokio::test]
    async fn test_move_reaches_target() {
        // 0.70 m idle, 0.72 m rising, 0.75 m stopped
        let link = FakeLink::new(vec![reading(800, 0), reading(1000, 300), reading(1300, 0)]);
        let target = protocol::encode_target(0.75).unwrap();

        tokio_test::assert_ok!(
            desk(30)
                .drive(&link, &desk_characteristics(), 0.75, &target)
                .await
        );

        let writes = link.writes.lock().unwrap();
        assert_eq!(writes[0], (protocol::COMMAND_UUID, protocol::COMMAND_WAKEUP.to_vec()));
        assert_eq!(
            writes.last().unwrap(),
            &(protocol::REFERENCE_INPUT_UUID, target.to_vec())
        );
    }

    #[tokio::test]
    async fn test_read_failure_mid_move_stops_desk() {
        let link = FakeLink::new(vec![reading(800, 0), reading(1000, 300)]);
        let target = protocol::encode_target(0.75).unwrap();

        let err = tokio_test::assert_err!(
            desk(30)
                .drive(&link, &desk_characteristics(), 0.75, &target)
                .await
        );
        assert!(matches!(err, DeskError::Btleplug(_)));
        assert_eq!(link.last_writes(2), stop_writes());
    }

    #[tokio::test]
    async fn test_timeout_stops_desk() {
        let link = FakeLink::new(vec![reading(800, 0), reading(800, 0)]);
        let target = protocol::encode_target(0.75).unwrap();

        let err = tokio_test::assert_err!(
            desk(0)
                .drive(&link, &desk_characteristics(), 0.75, &target)
                .await
        );
        assert!(matches!(err, DeskError::Timeout(_)));
        assert_eq!(link.last_writes(2), stop_writes());
    }

    #[tokio::test]
    async fn test_out_of_range_rejected_before_radio() {
        // adapter index far out of range: reaching the adapter would fail
        // with NoAdapter, so a HeightOutOfRange proves no lookup happened
        let ble = BleConfig {
            adapter_index: usize::MAX,
            ..BleConfig::default()
        };
        let desk = IdasenDesk::new(&ble, &DeskConfig::default());

        let err = tokio_test::assert_err!(desk.move_to_target("ED:B1:91:47:29:55", 2.0).await);
        assert!(matches!(err, DeskError::HeightOutOfRange(h) if h == 2.0));
    }

    #[test]
    fn test_settings_from_config() {
        let desk = IdasenDesk::new(
            &BleConfig::default(),
            &DeskConfig {
                move_timeout_secs: 12,
            },
        );
        assert_eq!(desk.move_timeout, Duration::from_secs(12));
        assert_eq!(desk.connect_timeout, Duration::from_secs(10));
    }
}
