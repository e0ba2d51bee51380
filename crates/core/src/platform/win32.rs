use std::mem::size_of;

use anyhow::{bail, Context, Result};
use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::Shell::{IsUserAnAdmin, ShellExecuteW};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN, SW_SHOWNORMAL};

use crate::types::*;
use crate::logger;
use super::{InputInjector, Platform, PrivilegeChecker, ScreenCapture};

// Virtual-key codes for named keys
fn named_key_code(key: &str) -> Option<u16> {
    let code = match key {
        "enter" | "return" => 0x0D,
        "escape" | "esc" => 0x1B,
        "delete" | "backspace" => 0x08,
        "tab" => 0x09,
        "space" => 0x20,
        "up" => 0x26,
        "down" => 0x28,
        "left" => 0x25,
        "right" => 0x27,
        _ => {
            let n: u16 = key.strip_prefix('f')?.parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            0x70 + n - 1
        }
    };
    Some(code)
}

fn virtual_key(key: &str) -> Option<u16> {
    let lower = key.to_lowercase();
    if let Some(code) = named_key_code(&lower) {
        return Some(code);
    }
    let mut chars = lower.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    match ch {
        '0'..='9' | 'a'..='z' => Some(ch.to_ascii_uppercase() as u16),
        _ => {
            let scan = unsafe { VkKeyScanW(ch as u16) };
            if scan == -1 { None } else { Some((scan as u16) & 0xFF) }
        }
    }
}

fn key_input(vk: u16, up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: if up { KEYEVENTF_KEYUP } else { KEYBD_EVENT_FLAGS(0) },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        WindowsPlatform
    }
}

impl ScreenCapture for WindowsPlatform {
    fn screen_size(&mut self) -> Result<(u32, u32)> {
        let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if w <= 0 || h <= 0 {
            bail!("GetSystemMetrics returned {}x{}", w, h);
        }
        Ok((w as u32, h as u32))
    }

    fn capture(&mut self, rect: CaptureRect) -> Result<Capture> {
        if rect.w <= 0 || rect.h <= 0 {
            bail!("empty capture rect {:?}", rect);
        }

        let mut data = vec![0u8; (rect.w * rect.h * 4) as usize];
        let (blit, lines) = unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                bail!("GetDC failed");
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, rect.w, rect.h);
            let old = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, rect.w, rect.h, screen_dc, rect.l, rect.t, SRCCOPY).ok();

            // Negative height: top-down rows, 32bpp BGRA
            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: rect.w,
                    biHeight: -rect.h,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                rect.h as u32,
                Some(data.as_mut_ptr().cast()),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, old);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);
            (blit, lines)
        };

        blit.context("BitBlt failed")?;
        if lines == 0 {
            bail!("GetDIBits copied no rows for {:?}", rect);
        }

        Ok(Capture {
            data,
            width: rect.w as u32,
            height: rect.h as u32,
            bytes_per_row: rect.w as u32 * 4,
        })
    }
}

impl InputInjector for WindowsPlatform {
    fn tap(&mut self, key: &str) -> Result<()> {
        let Some(vk) = virtual_key(key) else {
            bail!("unknown key: {}", key);
        };
        let inputs = [key_input(vk, false), key_input(vk, true)];
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            bail!("SendInput accepted {} of {} events", sent, inputs.len());
        }
        Ok(())
    }
}

impl PrivilegeChecker for WindowsPlatform {
    fn is_elevated(&self) -> bool {
        unsafe { IsUserAnAdmin().as_bool() }
    }

    fn relaunch_elevated(&self) -> Result<()> {
        let exe = std::env::current_exe().context("locating current executable")?;
        let args: Vec<String> = std::env::args()
            .skip(1)
            .map(|a| if a.contains(' ') { format!("\"{}\"", a) } else { a })
            .collect();

        let file = HSTRING::from(exe.as_os_str());
        let params = HSTRING::from(args.join(" "));
        logger::info_p("windows", &format!("relaunching {} as administrator", exe.display()));

        let result = unsafe {
            ShellExecuteW(HWND::default(), w!("runas"), &file, &params, PCWSTR::null(), SW_SHOWNORMAL)
        };
        // ShellExecute reports success with values above 32
        if result.0 as isize <= 32 {
            bail!("elevation request failed or was declined (code {})", result.0 as isize);
        }
        Ok(())
    }
}

impl Platform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }
}
