#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn xian_vsync_abi_version() -> u32 {
    super::XIAN_VSYNC_ABI_VERSION
}
