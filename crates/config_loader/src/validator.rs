//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (`validator` derive)：tile mask <= 0b1111, target_latency >= -1
//! - auto 模式只支持 DAC tiles
//! - simulator 参数合法 (mask <= 0b1111，因子/words/latency 在硬件范围内)

use contracts::{
    CalibrationMode, CalibrationProfile, MtsError, SimulatedConverter, TileMask,
};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 CalibrationProfile 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(profile: &CalibrationProfile) -> Result<(), MtsError> {
    validate_ranges(profile)?;
    validate_mode(profile)?;
    validate_simulator(profile)?;
    Ok(())
}

/// 字段范围校验
fn validate_ranges(profile: &CalibrationProfile) -> Result<(), MtsError> {
    profile.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, "")
            .unwrap_or_else(|| ("profile".to_string(), errors.to_string()));
        MtsError::config_validation(field, message)
    })
}

/// 按字段名排序取第一个错误，返回 (路径, 消息)
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(list) => list
                .first()
                .map(|error| (path.clone(), error.to_string())),
            ValidationErrorsKind::Struct(nested) => first_error(nested, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, nested)| first_error(nested, &format!("{path}[{index}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验标定模式
fn validate_mode(profile: &CalibrationProfile) -> Result<(), MtsError> {
    if profile.coordinator.mode == CalibrationMode::Auto && profile.adc.tiles != 0 {
        return Err(MtsError::config_validation(
            "adc.tiles",
            format!(
                "auto mode supports DAC tiles only, got ADC mask {}",
                TileMask::new(profile.adc.tiles)
            ),
        ));
    }
    Ok(())
}

/// RFdc 抽取/插值因子上限 (40x)
const MAX_CONVERSION_FACTOR: u32 = 40;
/// 每个 fabric 周期的最大 word 数
const MAX_SAMPLE_WORDS: u32 = 16;
/// 模拟自然 latency 上限 (T1 ticks)
const MAX_NATURAL_LATENCY: i32 = 0xFFFF;

/// 校验模拟设备参数
fn validate_simulator(profile: &CalibrationProfile) -> Result<(), MtsError> {
    let Some(simulator) = &profile.simulator else {
        return Ok(());
    };
    validate_simulated_converter("simulator.dac", &simulator.dac)?;
    validate_simulated_converter("simulator.adc", &simulator.adc)?;
    Ok(())
}

fn validate_simulated_converter(
    field: &str,
    converter: &SimulatedConverter,
) -> Result<(), MtsError> {
    if !TileMask::new(converter.mts_disabled_tiles).is_valid() {
        return Err(MtsError::config_validation(
            format!("{field}.mts_disabled_tiles"),
            format!(
                "mask must be <= 0b1111, got {:#b}",
                converter.mts_disabled_tiles
            ),
        ));
    }
    if let Some(tile) = converter
        .factor
        .iter()
        .position(|f| !(1..=MAX_CONVERSION_FACTOR).contains(f))
    {
        return Err(MtsError::config_validation(
            format!("{field}.factor[{tile}]"),
            format!(
                "factor must be in 1..={MAX_CONVERSION_FACTOR}, got {}",
                converter.factor[tile]
            ),
        ));
    }
    if let Some(tile) = converter
        .sample_words
        .iter()
        .position(|w| !(1..=MAX_SAMPLE_WORDS).contains(w))
    {
        return Err(MtsError::config_validation(
            format!("{field}.sample_words[{tile}]"),
            format!(
                "sample_words must be in 1..={MAX_SAMPLE_WORDS}, got {}",
                converter.sample_words[tile]
            ),
        ));
    }
    if let Some(tile) = converter
        .natural_latency
        .iter()
        .position(|l| !(0..=MAX_NATURAL_LATENCY).contains(l))
    {
        return Err(MtsError::config_validation(
            format!("{field}.natural_latency[{tile}]"),
            format!(
                "natural latency must be in 0..={MAX_NATURAL_LATENCY}, got {}",
                converter.natural_latency[tile]
            ),
        ));
    }
    Ok(())
}
