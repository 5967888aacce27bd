// ==========================================
// 可变计量单位定价引擎 - 舍入规则
// ==========================================
// 面积: 单件 4 位小数，合计 3 位小数
// 长度: 全程 2 位小数
// 金额/单价: 2 位小数
// 每个阶段都舍入，保证相同输入重复计算结果逐位一致
// ==========================================

pub const AREA_UNIT_DECIMALS: u32 = 4;
pub const AREA_TOTAL_DECIMALS: u32 = 3;
pub const LENGTH_DECIMALS: u32 = 2;
pub const CURRENCY_DECIMALS: u32 = 2;

/// 四舍五入（half-up）到指定小数位
///
/// 先在 1e-6 粒度上消除二进制表示误差（如 1.005 * 100 = 100.49999...），
/// 再进行整数舍入
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = ((value * factor) * 1e6).round() / 1e6;
    scaled.round() / factor
}

/// 金额舍入
pub fn round_currency(value: f64) -> f64 {
    round_half_up(value, CURRENCY_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_up() {
        assert_eq!(round_half_up(1.005, 2), 1.01);
        assert_eq!(round_half_up(2.675, 2), 2.68);
        assert_eq!(round_half_up(0.12345, 4), 0.1235);
        assert_eq!(round_half_up(0.3702, 3), 0.37);
        assert_eq!(round_half_up(10.0, 2), 10.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(round_half_up(f64::NAN, 2), 0.0);
        assert_eq!(round_half_up(f64::INFINITY, 2), 0.0);
    }

    #[test]
    fn test_idempotent() {
        let once = round_currency(14.999_999);
        assert_eq!(round_currency(once), once);
    }
}
