//! NetGuard FFI 绑定
//!
//! 提供 C ABI 兼容的接口，供移动端或其他语言的界面层调用。
//! 仪表盘句柄使用样例数据，不访问网络。

use std::ffi::{c_char, c_int, c_uint, c_ulong, CStr};
use std::ptr;

use netguard_core::validation::passwords_match;
use netguard_core::{
    BlockOutcome, Dashboard, Error, FixtureProvider, HistoryWindow, RegistrationDraft, Session,
};
use tokio::runtime::Runtime;
use tracing::warn;

/// 错误码定义
pub const NETGUARD_OK: c_int = 0;
pub const NETGUARD_ERR_NULL_PTR: c_int = -1;
pub const NETGUARD_ERR_INVALID_PARAM: c_int = -2;
pub const NETGUARD_ERR_VALIDATION: c_int = -3;
pub const NETGUARD_ERR_NETWORK: c_int = -4;
pub const NETGUARD_ERR_ENCODING: c_int = -5;
pub const NETGUARD_ERR_STATE: c_int = -6;
/// 断网命令失败，设备状态已回滚
pub const NETGUARD_ERR_REVERTED: c_int = -7;

fn error_code(e: &Error) -> c_int {
    match e {
        Error::Validation(_) => NETGUARD_ERR_VALIDATION,
        Error::InvalidParam(_) => NETGUARD_ERR_INVALID_PARAM,
        Error::Network(_) | Error::Timeout | Error::Status { .. } | Error::Rejected(_) => {
            NETGUARD_ERR_NETWORK
        }
        Error::Encoding(_) => NETGUARD_ERR_ENCODING,
        _ => NETGUARD_ERR_STATE,
    }
}

/// 读取 C 字符串；非 UTF-8 返回 None
unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    CStr::from_ptr(s).to_str().ok()
}

/// 把文本写入调用方缓冲区（按容量截断，始终以 NUL 结尾）
unsafe fn write_str(text: &str, out: *mut c_char, cap: c_ulong, out_len: *mut c_ulong) {
    if cap == 0 {
        *out_len = 0;
        return;
    }
    let bytes = text.as_bytes();
    let mut len = bytes.len().min(cap as usize - 1);
    while !text.is_char_boundary(len) {
        len -= 1;
    }
    ptr::copy_nonoverlapping(bytes.as_ptr(), out as *mut u8, len);
    *out.add(len) = 0;
    *out_len = len as c_ulong;
}

/// 校验注册表单
///
/// 通过返回 NETGUARD_OK；未通过返回 NETGUARD_ERR_VALIDATION，
/// 第一条未通过的提示写入 `out_msg`。头像不经过此接口。
#[no_mangle]
pub extern "C" fn netguard_validate_registration(
    name: *const c_char,
    email: *const c_char,
    phone: *const c_char,
    age: *const c_char,
    password: *const c_char,
    accept_terms: c_int,
    accept_privacy: c_int,
    out_msg: *mut c_char,
    msg_cap: c_ulong,
    out_len: *mut c_ulong,
) -> c_int {
    if name.is_null()
        || email.is_null()
        || phone.is_null()
        || age.is_null()
        || password.is_null()
        || out_msg.is_null()
        || out_len.is_null()
    {
        return NETGUARD_ERR_NULL_PTR;
    }

    let fields = unsafe {
        (
            read_str(name),
            read_str(email),
            read_str(phone),
            read_str(age),
            read_str(password),
        )
    };
    let (Some(name), Some(email), Some(phone), Some(age), Some(password)) = fields else {
        return NETGUARD_ERR_ENCODING;
    };

    let draft = RegistrationDraft {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        age: age.to_string(),
        password: password.to_string(),
        profile_image: None,
        accept_terms: accept_terms != 0,
        accept_privacy: accept_privacy != 0,
    };

    match draft.validate() {
        Ok(_) => {
            unsafe { write_str("", out_msg, msg_cap, out_len) };
            NETGUARD_OK
        }
        Err(Error::Validation(msg)) => {
            unsafe { write_str(&msg, out_msg, msg_cap, out_len) };
            NETGUARD_ERR_VALIDATION
        }
        Err(e) => error_code(&e),
    }
}

/// 检查新密码与确认密码是否一致
#[no_mangle]
pub extern "C" fn netguard_passwords_match(
    new_password: *const c_char,
    confirm: *const c_char,
) -> c_int {
    if new_password.is_null() || confirm.is_null() {
        return NETGUARD_ERR_NULL_PTR;
    }

    let (Some(new_password), Some(confirm)) =
        (unsafe { read_str(new_password) }, unsafe { read_str(confirm) })
    else {
        return NETGUARD_ERR_ENCODING;
    };

    match passwords_match(new_password, confirm) {
        Ok(()) => NETGUARD_OK,
        Err(e) => error_code(&e),
    }
}

/// 仪表盘上下文
pub struct DashboardContext {
    runtime: Runtime,
    dashboard: Dashboard,
}

/// 创建样例数据仪表盘；`parent_name` 为空指针时显示 "Parent"
#[no_mangle]
pub extern "C" fn netguard_dashboard_new(parent_name: *const c_char) -> *mut DashboardContext {
    let parent_display_name = if parent_name.is_null() {
        "Parent".to_string()
    } else {
        match unsafe { read_str(parent_name) } {
            Some(name) => name.to_string(),
            None => return ptr::null_mut(),
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Failed to create runtime: {}", e);
            return ptr::null_mut();
        }
    };

    let session = Session {
        token: String::new(),
        parent_display_name,
    };
    let dashboard = Dashboard::new(Box::new(FixtureProvider::new()), session);

    Box::into_raw(Box::new(DashboardContext { runtime, dashboard }))
}

/// 销毁仪表盘上下文
#[no_mangle]
pub extern "C" fn netguard_dashboard_free(ctx: *mut DashboardContext) {
    if !ctx.is_null() {
        unsafe {
            drop(Box::from_raw(ctx));
        }
    }
}

/// 加载数据（阻塞，包含模拟延迟）
#[no_mangle]
pub extern "C" fn netguard_dashboard_load(ctx: *mut DashboardContext) -> c_int {
    if ctx.is_null() {
        return NETGUARD_ERR_NULL_PTR;
    }

    let ctx = unsafe { &mut *ctx };
    let DashboardContext { runtime, dashboard } = ctx;

    match runtime.block_on(dashboard.fetch_data()) {
        Ok(()) => NETGUARD_OK,
        Err(e) => error_code(&e),
    }
}

/// 顶部统计：设备总数、在线数、断网数、总流量（GB）
#[no_mangle]
pub extern "C" fn netguard_dashboard_summary(
    ctx: *const DashboardContext,
    out_total: *mut c_uint,
    out_online: *mut c_uint,
    out_blocked: *mut c_uint,
    out_data_usage: *mut f64,
) -> c_int {
    if ctx.is_null()
        || out_total.is_null()
        || out_online.is_null()
        || out_blocked.is_null()
        || out_data_usage.is_null()
    {
        return NETGUARD_ERR_NULL_PTR;
    }

    let ctx = unsafe { &*ctx };
    let summary = ctx.dashboard.summary();

    unsafe {
        *out_total = summary.total_devices as c_uint;
        *out_online = summary.online as c_uint;
        *out_blocked = summary.blocked as c_uint;
        *out_data_usage = summary.data_usage;
    }
    NETGUARD_OK
}

/// 切换断网状态，`out_blocked` 写入切换后的状态（回滚时为原状态）
#[no_mangle]
pub extern "C" fn netguard_dashboard_toggle_block(
    ctx: *mut DashboardContext,
    device_id: i64,
    out_blocked: *mut c_int,
) -> c_int {
    if ctx.is_null() || out_blocked.is_null() {
        return NETGUARD_ERR_NULL_PTR;
    }

    let ctx = unsafe { &mut *ctx };
    let DashboardContext { runtime, dashboard } = ctx;

    match runtime.block_on(dashboard.toggle_device_block(device_id)) {
        Ok(BlockOutcome::Confirmed { blocked }) => {
            unsafe { *out_blocked = blocked as c_int };
            NETGUARD_OK
        }
        Ok(BlockOutcome::Reverted { blocked, .. }) => {
            unsafe { *out_blocked = blocked as c_int };
            NETGUARD_ERR_REVERTED
        }
        Err(e) => error_code(&e),
    }
}

/// 设备在最近 `window_days` 天（1/3/7/15/30）内的浏览记录条数
#[no_mangle]
pub extern "C" fn netguard_dashboard_history_count(
    ctx: *mut DashboardContext,
    device_id: i64,
    window_days: c_uint,
    out_count: *mut c_uint,
) -> c_int {
    if ctx.is_null() || out_count.is_null() {
        return NETGUARD_ERR_NULL_PTR;
    }

    let window = match format!("{}d", window_days).parse::<HistoryWindow>() {
        Ok(window) => window,
        Err(e) => return error_code(&e),
    };

    let ctx = unsafe { &mut *ctx };
    if ctx.dashboard.device(device_id).is_none() {
        return NETGUARD_ERR_INVALID_PARAM;
    }
    ctx.dashboard.set_historical_filter(window);

    let count = ctx.dashboard.history_for(device_id).len();
    unsafe { *out_count = count as c_uint };
    NETGUARD_OK
}
