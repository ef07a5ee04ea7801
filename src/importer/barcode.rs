// ==========================================
// 商品同步连接器 - 条码校验
// ==========================================
// 规则: EAN-13（12 位数据 + 1 位校验位）
// ==========================================

/// EAN-13 校验位是否正确
pub fn check_ean(barcode: &str) -> bool {
    let code = barcode.trim();
    if code.len() != 13 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = code.bytes().map(|b| u32::from(b - b'0')).collect();
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    check == digits[12]
}
