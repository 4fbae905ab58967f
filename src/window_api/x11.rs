use anyhow::{anyhow, Result};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::instrument;
use xcb::{
    x::{Atom, GetProperty, GrabServer, InternAtom, UngrabServer, Window, ATOM_ANY},
    Connection,
};

use super::{ApplicationObservation, ForegroundResolver};

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Window> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<Window>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("_NET_ACTIVE_WINDOW is not set"))
}

pub struct LinuxResolver {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
    pid_atom: Atom,
    system: System,
}

impl LinuxResolver {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen: preferred_screen.max(0) as usize,
            active_window_atom,
            pid_atom,
            system: System::new(),
        })
    }

    fn executable_of(&mut self, pid: u32) -> Option<std::path::PathBuf> {
        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system
            .process(pid)
            .and_then(|v| v.exe())
            .map(|v| v.to_path_buf())
    }

    #[instrument(skip(self))]
    fn get_active_inner(&mut self) -> Result<ApplicationObservation> {
        // Currently the application only supports 1 x11 screen.
        let root = self
            .connection
            .get_setup()
            .roots()
            .nth(self.preferred_screen)
            .ok_or_else(|| anyhow!("Screen {} doesn't exist", self.preferred_screen))?
            .root();

        let active_window = get_active_window(&self.connection, root, self.active_window_atom)?;
        let Some(pid) = get_pid(&self.connection, active_window, self.pid_atom)? else {
            return Ok(ApplicationObservation::unknown());
        };
        Ok(self
            .executable_of(pid)
            .map_or_else(ApplicationObservation::unknown, ApplicationObservation::from_executable))
    }
}

impl ForegroundResolver for LinuxResolver {
    #[instrument(skip(self))]
    fn current_foreground_app(&mut self) -> Result<ApplicationObservation> {
        let _ = self.connection.send_request(&GrabServer {});
        let result = self.get_active_inner();
        let _ = self.connection.send_request(&UngrabServer {});
        result
    }
}
