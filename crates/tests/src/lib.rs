//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（mock 驱动 / 模拟设备，无需硬件）
//! - 配置加载到标定的完整流程

#[cfg(test)]
mod contract_tests {
    use contracts::{MtsFailureKind, MtsStatus};

    #[test]
    fn test_profile_version_snapshot() {
        use config_loader::{ConfigFormat, ConfigLoader};
        use contracts::ProfileVersion;

        assert_eq!(ProfileVersion::default(), ProfileVersion::V1);
        assert_eq!(serde_json::to_string(&ProfileVersion::V1).unwrap(), r#""V1""#);

        // 未写 version 的 profile 按 V1 处理
        let profile =
            ConfigLoader::load_from_str("[dac]\ntiles = 1\n", ConfigFormat::Toml).unwrap();
        assert_eq!(profile.version, ProfileVersion::V1);
        assert!(ConfigLoader::to_toml(&profile)
            .unwrap()
            .contains(r#"version = "V1""#));

        assert!(serde_json::from_str::<ProfileVersion>(r#""V2""#).is_err());
    }

    #[test]
    fn test_status_bits_match_vendor_values() {
        assert_eq!(MtsStatus::OK.raw(), 0);
        assert_eq!(MtsStatus::NOT_SUPPORTED.raw(), 1);
        assert_eq!(MtsStatus::TIMEOUT.raw(), 2);
        assert_eq!(MtsStatus::MARKER_RUN.raw(), 4);
        assert_eq!(MtsStatus::MARKER_MISMATCH.raw(), 8);
        assert_eq!(MtsStatus::DELAY_OVER.raw(), 16);
        assert_eq!(MtsStatus::TARGET_LOW.raw(), 32);
        assert_eq!(MtsStatus::IP_NOT_READY.raw(), 64);
        assert_eq!(MtsStatus::DTC_INVALID.raw(), 128);
        assert_eq!(MtsStatus::NOT_ENABLED.raw(), 512);
        assert_eq!(MtsStatus::SYSREF_GATE_ERROR.raw(), 2048);
        assert_eq!(MtsStatus::SYSREF_FREQ_NOT_DONE.raw(), 4096);
        assert_eq!(MtsStatus::BAD_REF_TILE.raw(), 8192);
    }

    #[test]
    fn test_failure_kind_flags() {
        assert_eq!(MtsFailureKind::Timeout.flag(), Some(MtsStatus::TIMEOUT));
        assert_eq!(
            MtsFailureKind::BadReferenceTile.flag(),
            Some(MtsStatus::BAD_REF_TILE)
        );
        assert_eq!(MtsFailureKind::Unclassified.flag(), None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConverterType, MtsError, MtsFailureKind, MtsStatus, TileMask};
    use mts_engine::{CoordinatorConfig, MtsCoordinator};
    use observability::CalibrationMetricsAggregator;
    use rfdc_driver::{DriverCall, MockRfdc, MockSyncResponse, SimulatedRfdc};

    fn no_settle() -> CoordinatorConfig {
        CoordinatorConfig::default().settle_delay(Duration::ZERO)
    }

    /// End-to-end test: measure -> plan -> align on the mock driver
    ///
    /// 验证两阶段流程：
    /// 1. 测量 natural latency [5, 9]
    /// 2. 目标 = 9 + 16 = 25
    /// 3. 所有 tile 对齐到 25
    #[test]
    fn test_e2e_auto_run_mock() {
        let driver = MockRfdc::new()
            .with_response(ConverterType::Dac, MockSyncResponse::ok([5, 9, 0, 0]))
            .with_response(
                ConverterType::Dac,
                MockSyncResponse::ok([25, 25, 0, 0]).with_offset([20, 16, 0, 0]),
            );
        let mut coordinator = MtsCoordinator::with_config(driver, no_settle());

        let plan = coordinator
            .auto_run_mts(TileMask::new(0b0011), TileMask::NONE)
            .unwrap();
        assert_eq!(plan.dac_target_latency, 25);

        let report = coordinator.report(ConverterType::Dac).unwrap();
        assert_eq!(report.latencies(), vec![25, 25]);
        assert_eq!(report.status, MtsStatus::OK);
        assert_eq!(report.tile_reports[1].offset, 16);

        let targets: Vec<i32> = coordinator
            .driver()
            .sync_calls(ConverterType::Dac)
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::Sync { target_latency, .. } => Some(target_latency),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![-1, 25]);
        assert!(coordinator
            .driver()
            .sync_calls(ConverterType::Adc)
            .is_empty());
    }

    #[test]
    fn test_e2e_phase_one_timeout_stops_sequence() {
        let driver = MockRfdc::new().with_response(
            ConverterType::Dac,
            MockSyncResponse::status(MtsStatus::TIMEOUT),
        );
        let mut coordinator = MtsCoordinator::with_config(driver, no_settle());

        let err = coordinator
            .auto_run_mts(TileMask::new(0b1111), TileMask::NONE)
            .unwrap_err();

        assert_eq!(err.kind(), Some(MtsFailureKind::Timeout));
        let syncs = coordinator.driver().sync_calls(ConverterType::Dac);
        assert_eq!(syncs.len(), 1);
        assert!(matches!(
            syncs[0],
            DriverCall::Sync {
                target_latency: -1,
                ..
            }
        ));
    }

    #[test]
    fn test_e2e_dac_before_adc() {
        let mut coordinator = MtsCoordinator::with_config(MockRfdc::new(), no_settle());
        coordinator
            .init_mts(40, TileMask::new(0b0001), 50, TileMask::new(0b0011))
            .unwrap();

        let order: Vec<ConverterType> = coordinator
            .driver()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::Sync { converter, .. } => Some(converter),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![ConverterType::Dac, ConverterType::Adc]);
    }

    #[test]
    fn test_e2e_simulated_device_from_profile() {
        let profile = ConfigLoader::load_from_str(
            r#"
[dac]
tiles = 15
target_latency = 90

[adc]
tiles = 3
target_latency = 80

[coordinator]
settle_delay_ms = 0

[simulator.dac]
natural_latency = [70, 72, 71, 73]
factor = [8, 8, 8, 8]

[simulator.adc]
natural_latency = [60, 62, 0, 0]
factor = [2, 2, 2, 2]
sample_words = [4, 4, 4, 4]
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let driver = SimulatedRfdc::from_profile(profile.simulator.as_ref().unwrap());
        let mut coordinator =
            MtsCoordinator::with_config(driver, CoordinatorConfig::from_profile(&profile));

        coordinator
            .init_mts(
                profile.dac.target_latency,
                TileMask::new(profile.dac.tiles),
                profile.adc.target_latency,
                TileMask::new(profile.adc.tiles),
            )
            .unwrap();

        let dac = coordinator.report(ConverterType::Dac).unwrap();
        assert_eq!(dac.latencies(), vec![90; 4]);
        assert_eq!(
            dac.tile_reports.iter().map(|t| t.offset).collect::<Vec<_>>(),
            vec![20, 18, 19, 17]
        );
        assert_eq!(dac.tile_reports[0].factor, 8);

        let adc = coordinator.report(ConverterType::Adc).unwrap();
        assert_eq!(adc.latencies(), vec![80, 80]);
        assert_eq!(adc.tile_reports[0].factor, 2);

        let mut aggregator = CalibrationMetricsAggregator::new();
        aggregator.update(&dac);
        aggregator.update(&adc);
        let summary = aggregator.summary();
        assert_eq!(summary.passes_ok, 2);
        assert_eq!(summary.latency_spread[&ConverterType::Dac].max, 0.0);
    }

    #[test]
    fn test_e2e_simulated_adc_plan() {
        let mut coordinator = MtsCoordinator::with_config(SimulatedRfdc::new(), no_settle());

        // ADC has no auto sequence; measure and plan explicitly
        coordinator
            .init_mts(-1, TileMask::NONE, -1, TileMask::new(0b0011))
            .unwrap();
        let plan = coordinator
            .plan_targets(TileMask::NONE, TileMask::new(0b0011))
            .unwrap();
        // default model: natural [64, 66], 8 words x decimation 1
        assert_eq!(plan.adc_target_latency, 74);

        coordinator
            .sync_mts(0, TileMask::NONE, plan.adc_target_latency, TileMask::new(0b0011))
            .unwrap();
        assert_eq!(
            coordinator.report(ConverterType::Adc).unwrap().latencies(),
            vec![74, 74]
        );
    }

    #[test]
    fn test_e2e_simulated_failures_aggregate() {
        let profile = ConfigLoader::load_from_str(
            r#"
[simulator.adc]
mts_disabled_tiles = 2
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let driver = SimulatedRfdc::from_profile(profile.simulator.as_ref().unwrap());
        let mut coordinator = MtsCoordinator::with_config(driver, no_settle());

        // DAC mask without the reference tile, ADC tile 1 built without MTS
        let err = coordinator
            .init_mts(-1, TileMask::new(0b0010), -1, TileMask::new(0b0011))
            .unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].kind, MtsFailureKind::BadReferenceTile);
        assert_eq!(failures[1].kind, MtsFailureKind::NotEnabled);
        assert!(err.to_string().contains("DAC"));
        assert!(err.to_string().contains("ADC"));
    }

    #[test]
    fn test_e2e_auto_run_rejects_adc() {
        let mut coordinator = MtsCoordinator::new(SimulatedRfdc::new());
        let err = coordinator
            .auto_run_mts(TileMask::new(0b0001), TileMask::new(0b0001))
            .unwrap_err();
        assert!(matches!(err, MtsError::AdcAutoSequencingUnsupported { .. }));
        assert_eq!(coordinator.driver().sync_count(ConverterType::Dac), 0);
        assert_eq!(coordinator.driver().sync_count(ConverterType::Adc), 0);
    }

    /// 共享协调器：整个 init/sync/report 周期在同一把锁内完成
    #[tokio::test]
    async fn test_e2e_shared_coordinator() {
        let coordinator = Arc::new(Mutex::new(MtsCoordinator::with_config(
            SimulatedRfdc::new(),
            no_settle(),
        )));

        let mut handles = Vec::new();
        for target in [80, 90, 100] {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::task::spawn_blocking(move || {
                let mut guard = coordinator.lock().unwrap();
                guard
                    .init_mts(target, TileMask::new(0b0011), -1, TileMask::NONE)
                    .unwrap();
                guard.report(ConverterType::Dac).unwrap()
            }));
        }

        for (handle, target) in handles.into_iter().zip([80, 90, 100]) {
            let report = handle.await.unwrap();
            assert_eq!(report.target_latency, target);
            assert_eq!(report.latencies(), vec![target, target]);
        }
    }
}
