//! Mock RFdc 驱动
//!
//! 用于单元测试的 mock 实现：按脚本返回同步结果，记录所有调用，支持注入失败场景。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use contracts::{
    ConverterType, DriverError, DtcSeed, MtsStatus, RfdcDriver, SyncConfig, TileMask, MAX_TILES,
};
use tracing::instrument;

/// 记录的驱动调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Init {
        reference_tile: u32,
    },
    Sync {
        converter: ConverterType,
        tiles: TileMask,
        target_latency: i32,
        reference_tile: u32,
        sysref_enable: bool,
    },
    ConfigureSysref {
        enable: bool,
    },
    DecimationFactor {
        tile: usize,
        block: usize,
    },
    InterpolationFactor {
        tile: usize,
        block: usize,
    },
    SampleWordsPerCycle {
        tile: usize,
        block: usize,
    },
    MtsEnabled {
        converter: ConverterType,
        tile: usize,
    },
}

impl DriverCall {
    /// 是否为 sync 调用
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }
}

/// 脚本化的 sync 返回
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSyncResponse {
    pub status: MtsStatus,
    /// 写回 config 的 latency（仅 enabled tiles）
    pub latency: [i32; MAX_TILES],
    /// 写回 config 的 offset（仅 enabled tiles）
    pub offset: [i32; MAX_TILES],
}

impl MockSyncResponse {
    /// 成功并写回指定 latency
    pub fn ok(latency: [i32; MAX_TILES]) -> Self {
        Self {
            status: MtsStatus::OK,
            latency,
            offset: [0; MAX_TILES],
        }
    }

    /// 返回指定状态，不写回测量值
    pub fn status(status: MtsStatus) -> Self {
        Self {
            status,
            latency: [0; MAX_TILES],
            offset: [0; MAX_TILES],
        }
    }

    /// 设置 offset
    pub fn with_offset(mut self, offset: [i32; MAX_TILES]) -> Self {
        self.offset = offset;
        self
    }
}

/// Mock 驱动配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 每个 tile 的抽取因子 (ADC, block 0)
    pub decimation: [u32; MAX_TILES],
    /// 每个 tile 的插值因子 (DAC, block 0)
    pub interpolation: [u32; MAX_TILES],
    /// 每个 tile 的 fabric words (ADC, block 0)
    pub sample_words: [u32; MAX_TILES],
    /// 未启用 MTS 的 tiles
    pub mts_disabled: HashMap<ConverterType, TileMask>,
    /// 因子查询是否返回传输错误
    pub fail_queries: bool,
    /// configure_sysref 返回的状态
    pub sysref_status: MtsStatus,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            decimation: [1; MAX_TILES],
            interpolation: [1; MAX_TILES],
            sample_words: [8; MAX_TILES],
            mts_disabled: HashMap::new(),
            fail_queries: false,
            sysref_status: MtsStatus::OK,
        }
    }
}

/// Mock RFdc 驱动
pub struct MockRfdc {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// 每种 converter 的脚本化 sync 返回
    responses: HashMap<ConverterType, VecDeque<MockSyncResponse>>,
    /// 调用记录
    calls: Mutex<Vec<DriverCall>>,
    /// SYSREF 当前状态
    sysref_enabled: bool,
}

impl MockRfdc {
    /// 创建默认 mock 驱动
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 驱动
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            sysref_enabled: false,
        }
    }

    /// 追加一个 sync 返回（按调用顺序消费）
    pub fn push_response(&mut self, converter: ConverterType, response: MockSyncResponse) {
        self.responses
            .entry(converter)
            .or_default()
            .push_back(response);
    }

    /// Builder 形式的 push_response
    pub fn with_response(mut self, converter: ConverterType, response: MockSyncResponse) -> Self {
        self.push_response(converter, response);
        self
    }

    /// 所有调用记录
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 调用总数
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// 指定 converter 的 sync 调用
    pub fn sync_calls(&self, converter: ConverterType) -> Vec<DriverCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, DriverCall::Sync { converter: c, .. } if *c == converter))
            .cloned()
            .collect()
    }

    /// SYSREF 是否已启用
    pub fn sysref_enabled(&self) -> bool {
        self.sysref_enabled
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_tile(
        &self,
        converter: ConverterType,
        tile: usize,
        block: usize,
    ) -> Result<(), DriverError> {
        if self.config.fail_queries {
            return Err(DriverError::transport("mock failure"));
        }
        if tile >= MAX_TILES || block >= MAX_TILES {
            return Err(DriverError::InvalidTile {
                converter,
                tile,
                block,
            });
        }
        Ok(())
    }

    /// 脚本为空时的默认行为：成功，目标模式下所有 tile 对齐到 target
    fn default_response(config: &SyncConfig) -> MockSyncResponse {
        let mut latency = [0; MAX_TILES];
        if !config.is_measure_only() {
            for tile in config.tiles.tiles() {
                latency[tile] = config.target_latency;
            }
        }
        MockSyncResponse::ok(latency)
    }
}

impl Default for MockRfdc {
    fn default() -> Self {
        Self::new()
    }
}

impl RfdcDriver for MockRfdc {
    #[instrument(name = "mock_rfdc_init", skip(self, config, seed))]
    fn multi_converter_init(
        &mut self,
        config: &mut SyncConfig,
        seed: &DtcSeed,
        reference_tile: u32,
    ) -> Result<(), DriverError> {
        self.record(DriverCall::Init { reference_tile });

        *config = SyncConfig {
            reference_tile,
            ..SyncConfig::default()
        };
        if let Some(codes) = seed.pll_codes {
            config.dtc_pll.target = codes;
        }
        if let Some(codes) = seed.t1_codes {
            config.dtc_t1.target = codes;
        }
        Ok(())
    }

    #[instrument(
        name = "mock_rfdc_sync",
        skip(self, config),
        fields(converter = %converter, tiles = %config.tiles, target = config.target_latency)
    )]
    fn multi_converter_sync(
        &mut self,
        converter: ConverterType,
        config: &mut SyncConfig,
    ) -> MtsStatus {
        self.record(DriverCall::Sync {
            converter,
            tiles: config.tiles,
            target_latency: config.target_latency,
            reference_tile: config.reference_tile,
            sysref_enable: config.sysref_enable,
        });

        let response = self
            .responses
            .get_mut(&converter)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Self::default_response(config));

        for tile in config.tiles.tiles() {
            config.latency[tile] = response.latency[tile];
            config.offset[tile] = response.offset[tile];
            config.dtc_pll.dtc_code[tile] = 10 + tile as i32;
            config.dtc_t1.dtc_code[tile] = 20 + tile as i32;
        }
        response.status
    }

    #[instrument(name = "mock_rfdc_configure_sysref", skip(self, _dac_config, _adc_config))]
    fn configure_sysref(
        &mut self,
        _dac_config: &SyncConfig,
        _adc_config: &SyncConfig,
        enable: bool,
    ) -> MtsStatus {
        self.record(DriverCall::ConfigureSysref { enable });
        self.sysref_enabled = enable;
        self.config.sysref_status
    }

    fn decimation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        self.record(DriverCall::DecimationFactor { tile, block });
        self.check_tile(ConverterType::Adc, tile, block)?;
        Ok(self.config.decimation[tile])
    }

    fn interpolation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        self.record(DriverCall::InterpolationFactor { tile, block });
        self.check_tile(ConverterType::Dac, tile, block)?;
        Ok(self.config.interpolation[tile])
    }

    fn sample_words_per_cycle(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        self.record(DriverCall::SampleWordsPerCycle { tile, block });
        self.check_tile(ConverterType::Adc, tile, block)?;
        Ok(self.config.sample_words[tile])
    }

    fn mts_enabled(&self, converter: ConverterType, tile: usize) -> Result<bool, DriverError> {
        self.record(DriverCall::MtsEnabled { converter, tile });
        self.check_tile(converter, tile, 0)?;
        let disabled = self
            .config
            .mts_disabled
            .get(&converter)
            .copied()
            .unwrap_or_default();
        Ok(!disabled.contains(tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dac_config(tiles: u32, target: i32) -> SyncConfig {
        SyncConfig {
            tiles: TileMask::new(tiles),
            sysref_enable: true,
            target_latency: target,
            ..Default::default()
        }
    }

    #[test]
    fn test_scripted_responses_in_order() {
        let mut driver = MockRfdc::new()
            .with_response(ConverterType::Dac, MockSyncResponse::ok([5, 9, 0, 0]))
            .with_response(
                ConverterType::Dac,
                MockSyncResponse::status(MtsStatus::TIMEOUT),
            );

        let mut config = dac_config(0b0011, -1);
        assert!(driver
            .multi_converter_sync(ConverterType::Dac, &mut config)
            .is_ok());
        assert_eq!(config.latency, [5, 9, 0, 0]);

        let status = driver.multi_converter_sync(ConverterType::Dac, &mut config);
        assert_eq!(status, MtsStatus::TIMEOUT);
        assert_eq!(driver.sync_calls(ConverterType::Dac).len(), 2);
        assert!(driver.sync_calls(ConverterType::Adc).is_empty());
    }

    #[test]
    fn test_default_response_aligns_to_target() {
        let mut driver = MockRfdc::new();
        let mut config = dac_config(0b0101, 40);
        driver.multi_converter_sync(ConverterType::Dac, &mut config);
        assert_eq!(config.latency, [40, 0, 40, 0]);
    }

    #[test]
    fn test_init_applies_seed() {
        let mut driver = MockRfdc::new();
        let mut config = dac_config(0b1111, 30);
        config.latency = [1, 2, 3, 4];
        let seed = DtcSeed {
            pll_codes: Some([1, 2, 3, 4]),
            t1_codes: None,
        };
        driver.multi_converter_init(&mut config, &seed, 0).unwrap();

        assert_eq!(config.latency, [0; MAX_TILES]);
        assert_eq!(config.tiles, TileMask::NONE);
        assert_eq!(config.dtc_pll.target, [1, 2, 3, 4]);
        assert_eq!(config.dtc_t1.target, [0; MAX_TILES]);
        assert_eq!(driver.calls(), vec![DriverCall::Init { reference_tile: 0 }]);
    }

    #[test]
    fn test_query_failure_injection() {
        let driver = MockRfdc::with_config(MockConfig {
            fail_queries: true,
            ..Default::default()
        });
        assert!(driver.decimation_factor(0, 0).is_err());
        assert!(matches!(
            MockRfdc::new().sample_words_per_cycle(7, 0),
            Err(DriverError::InvalidTile { tile: 7, .. })
        ));
    }
}
