//! Job objects: group processes so they can be limited and torn down together.

use crate::error::Result;
use crate::handle::OwnedHandle;
use crate::string::WideString;
use std::ffi::c_void;
use windows::Win32::Foundation::{BOOL, ERROR_MORE_DATA, HANDLE};
use windows::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, IsProcessInJob, JobObjectBasicAccountingInformation,
    JobObjectBasicProcessIdList, JobObjectExtendedLimitInformation, QueryInformationJobObject,
    SetInformationJobObject, TerminateJobObject, JOBOBJECTINFOCLASS,
    JOBOBJECT_BASIC_ACCOUNTING_INFORMATION, JOBOBJECT_BASIC_PROCESS_ID_LIST,
    JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
};
use windows::Win32::System::Threading::GetCurrentProcess;

/// A Windows job object.
pub struct Job {
    handle: OwnedHandle,
}

impl Job {
    /// Creates an anonymous job with default security.
    pub fn new() -> Result<Self> {
        // SAFETY: null attributes and name are allowed.
        let handle = crate::api_call!(CreateJobObjectW, unsafe { CreateJobObjectW(None, None) })?;
        Ok(Self {
            handle: OwnedHandle::new(handle)?,
        })
    }

    /// Creates, or opens if it already exists, the job called `name`.
    pub fn named(name: &str) -> Result<Self> {
        let name = WideString::new(name);
        // SAFETY: name is a live, null-terminated wide string.
        let handle = crate::api_call!(CreateJobObjectW, unsafe {
            CreateJobObjectW(None, name.as_pcwstr())
        })?;
        Ok(Self {
            handle: OwnedHandle::new(handle)?,
        })
    }

    /// Returns the raw job handle.
    #[inline]
    pub fn as_raw(&self) -> HANDLE {
        self.handle.as_raw()
    }

    /// Adds the process behind `process` to this job.
    ///
    /// The handle needs `PROCESS_SET_QUOTA` and `PROCESS_TERMINATE` access.
    pub fn assign(&self, process: HANDLE) -> Result<()> {
        // SAFETY: both handles are only read by the call.
        crate::api_call!(AssignProcessToJobObject, unsafe {
            AssignProcessToJobObject(self.as_raw(), process)
        })
    }

    /// Adds the calling process to this job.
    pub fn assign_current_process(&self) -> Result<()> {
        // SAFETY: the pseudo-handle needs no cleanup.
        self.assign(unsafe { GetCurrentProcess() })
    }

    /// Returns true if the calling process belongs to this job.
    pub fn contains_current_process(&self) -> Result<bool> {
        let mut result = BOOL(0);
        // SAFETY: result is a valid out-parameter.
        crate::api_call!(IsProcessInJob, unsafe {
            IsProcessInJob(GetCurrentProcess(), self.as_raw(), &mut result)
        })?;
        Ok(result.as_bool())
    }

    /// Kills every process in the job when the last job handle closes.
    pub fn set_kill_on_close(&self) -> Result<()> {
        let mut info = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
        self.query(JobObjectExtendedLimitInformation, &mut info)?;
        info.BasicLimitInformation.LimitFlags |= JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
        // SAFETY: info is a fully initialized structure of the declared size.
        crate::api_call!(SetInformationJobObject, unsafe {
            SetInformationJobObject(
                self.as_raw(),
                JobObjectExtendedLimitInformation,
                &info as *const _ as *const c_void,
                std::mem::size_of_val(&info) as u32,
            )
        })
    }

    /// Terminates every process in the job with `exit_code`.
    pub fn terminate(&self, exit_code: u32) -> Result<()> {
        // SAFETY: the handle is valid and owned.
        crate::api_call!(TerminateJobObject, unsafe {
            TerminateJobObject(self.as_raw(), exit_code)
        })
    }

    /// Number of processes currently running in the job.
    pub fn active_processes(&self) -> Result<u32> {
        let mut info = JOBOBJECT_BASIC_ACCOUNTING_INFORMATION::default();
        self.query(JobObjectBasicAccountingInformation, &mut info)?;
        Ok(info.ActiveProcesses)
    }

    /// Ids of the processes in the job.
    pub fn process_ids(&self) -> Result<Vec<u32>> {
        // The list header is two u32 counts followed by a ULONG_PTR array.
        let header_words = 8 / std::mem::size_of::<usize>();
        let mut capacity = 64;
        loop {
            let mut buffer = vec![0usize; header_words + capacity];
            // SAFETY: buffer is writable for the byte length passed.
            let queried = unsafe {
                QueryInformationJobObject(
                    self.as_raw(),
                    JobObjectBasicProcessIdList,
                    buffer.as_mut_ptr() as *mut c_void,
                    std::mem::size_of_val(buffer.as_slice()) as u32,
                    None,
                )
            };
            match queried {
                Ok(()) => {}
                Err(e) if e.code() == ERROR_MORE_DATA.to_hresult() => {
                    capacity *= 4;
                    continue;
                }
                Err(e) => {
                    return Err(crate::error::report_api_failure(
                        "QueryInformationJobObject",
                        file!(),
                        line!(),
                        e,
                    ))
                }
            }

            // SAFETY: the buffer starts with the list header the call filled in.
            let header = unsafe { &*(buffer.as_ptr() as *const JOBOBJECT_BASIC_PROCESS_ID_LIST) };
            let listed = header.NumberOfProcessIdsInList as usize;
            if header.NumberOfAssignedProcesses as usize > listed {
                capacity = header.NumberOfAssignedProcesses as usize;
                continue;
            }
            return Ok(buffer[header_words..header_words + listed]
                .iter()
                .map(|&pid| pid as u32)
                .collect());
        }
    }

    fn query<T>(&self, class: JOBOBJECTINFOCLASS, info: &mut T) -> Result<()> {
        // SAFETY: info is a writable T, the structure `class` describes.
        crate::api_call!(QueryInformationJobObject, unsafe {
            QueryInformationJobObject(
                self.as_raw(),
                class,
                info as *mut T as *mut c_void,
                std::mem::size_of::<T>() as u32,
                None,
            )
        })
    }
}
